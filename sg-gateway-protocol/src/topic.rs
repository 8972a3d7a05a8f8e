//! MQTT topic matching with `+` and `#` wildcards, per MQTT 3.1.1.

/// Check whether an MQTT topic matches a subscription pattern.
///
/// `+` matches exactly one level, `#` matches the remaining levels (including
/// the parent level, so `a/#` matches `a`) and is only valid as the final
/// token. Matching is case-sensitive; a single trailing delimiter is ignored
/// on both sides.
pub fn matches(pattern: &str, topic: &str) -> bool {
    if pattern == "#" {
        return true;
    }

    let pattern = pattern.strip_suffix('/').unwrap_or(pattern);
    let topic = topic.strip_suffix('/').unwrap_or(topic);

    let mut pattern_levels = pattern.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (pattern_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => continue,
            (Some(expected), Some(level)) => {
                if expected != level {
                    return false;
                }
            }
            (None, None) => return true,
            (Some(_), None) | (None, Some(_)) => return false,
        }
    }
}
