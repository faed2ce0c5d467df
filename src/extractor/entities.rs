//! HTML character entity decoding for extracted text.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(lt|gt|amp|quot|apos);").expect("valid entity pattern"));

/// Decode the five XML character entities the forum emits in titles and
/// abstracts.
///
/// Decoding is a single left-to-right pass, so `&amp;lt;` becomes `&lt;`
/// rather than `<`.
#[must_use]
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    ENTITY.replace_all(s, |caps: &Captures<'_>| match &caps[1] {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "quot" => "\"",
        _ => "'",
    })
}
