/// Turns a source identifier into a filesystem-safe directory token.
///
/// Lowercases, maps every non-alphanumeric run to a single `-`, and trims
/// leading/trailing separators, so `/data/clips/Big Buck Bunny.mp4`
/// becomes `data-clips-big-buck-bunny-mp4`. Deterministic: the same
/// source always maps to the same slug, which is what makes diagnostic
/// paths reproducible across runs.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_was_sep = true;
    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('-');
            last_was_sep = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Formats a seek timestamp for use inside a path segment.
///
/// `0.5` becomes `0p5`; trailing zeros are trimmed so `2.0` becomes `2`.
pub fn timestamp_token(ts: f64) -> String {
    let mut s = format!("{ts}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s.replace('.', "p").replace('-', "m")
}
