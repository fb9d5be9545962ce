pub mod random_verify_use_case;
pub mod stream_verify_use_case;
