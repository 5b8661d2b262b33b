use url::Url;

/// Sets `param` to `payload` in the query string of `url`.
///
/// Every other pair is kept in order. If the parameter is absent it is appended.
/// Returns `None` for unparseable URLs.
pub fn inject_param(url: &str, param: &str, payload: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;

    let mut replaced = false;
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            if k == param {
                replaced = true;
                (k.to_string(), payload.to_string())
            } else {
                (k.to_string(), v.to_string())
            }
        })
        .collect();

    {
        let mut query = parsed.query_pairs_mut();
        query.clear();
        for (k, v) in &pairs {
            query.append_pair(k, v);
        }
        if !replaced {
            query.append_pair(param, payload);
        }
    }

    Some(parsed.to_string())
}

/// Names of the query parameters of `url`, de-duplicated in first-seen order.
pub fn query_param_names(url: &Url) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (k, _) in url.query_pairs() {
        if !k.is_empty() && !names.iter().any(|n| n == k.as_ref()) {
            names.push(k.to_string());
        }
    }
    names
}
