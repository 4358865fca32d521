use url::Url;

/// Appends `params` to the query string of `url`, keeping any existing pairs.
pub fn append_params(
    mut url: Url,
    params: impl serde::Serialize,
) -> Result<Url, serde_urlencoded::ser::Error> {
    let encoded = serde_urlencoded::to_string(params)?;
    let pairs = form_urlencoded::parse(encoded.as_bytes());
    url.query_pairs_mut().extend_pairs(pairs);
    Ok(url)
}
