//! Resolution of `secret` + path segments into resource URLs.

use url::Url;

/// Join `segments` with `/` and strip any leading slashes from the result.
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    let joined = segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("/");
    joined.trim_start_matches('/').to_string()
}

/// Resolve `segments` beneath `secret` against `base`.
///
/// The resulting path is always `/{secret}/{joined segments}`; it replaces
/// any path on `base`, and the query and fragment are cleared. Characters
/// that are not valid in a URL path are percent-encoded.
///
/// `.` and `..` segments are resolved as in any URL path, so `../other`
/// escapes `secret` and addresses a sibling namespace.
///
/// Callers must reject an empty `secret` before getting here.
pub fn resolve<S: AsRef<str>>(base: &Url, secret: &str, segments: &[S]) -> Url {
    let mut url = base.clone();
    url.set_path(&format!("/{secret}/{}", join_segments(segments)));
    url.set_query(None);
    url.set_fragment(None);
    url
}
