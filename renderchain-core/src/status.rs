//! Human-readable status strings for tagged filters.

use crate::scaler::Scaler;
use crate::texture::TextureSize;

/// Describe how a resize gets from `input` to `output`.
///
/// Each axis is described on its own; when both axes agree only one
/// description is returned, otherwise they are labelled `X` and `Y`.
pub fn scale_description(
    input: TextureSize,
    output: TextureSize,
    upscaler: Scaler,
    downscaler: Scaler,
    convolver: Option<Scaler>,
) -> String {
    let x = axis_description(input.width, output.width, upscaler, downscaler, convolver);
    let y = axis_description(input.height, output.height, upscaler, downscaler, convolver);

    if x == y {
        return x;
    }
    join_status([sub_status("X", &x), sub_status("Y", &y)])
}

fn axis_description(
    input: u32,
    output: u32,
    upscaler: Scaler,
    downscaler: Scaler,
    convolver: Option<Scaler>,
) -> String {
    use std::cmp::Ordering;

    match input.cmp(&output) {
        Ordering::Less => format!("{}↑", upscaler.description()),
        Ordering::Greater => format!("{}↓", downscaler.description()),
        Ordering::Equal => convolver
            .map(|c| format!("{} convolution", c.description()))
            .unwrap_or_default(),
    }
}

fn sub_status(label: &str, status: &str) -> String {
    if status.is_empty() {
        String::new()
    } else {
        format!("{label}: {status}")
    }
}

/// Join non-empty status parts with `; `
pub fn join_status<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut joined = String::new();
    for part in parts {
        let part = part.as_ref();
        if part.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push_str("; ");
        }
        joined.push_str(part);
    }
    joined
}
