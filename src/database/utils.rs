use regex::Regex;

/// Collapse whitespace and rewrite `?` placeholders into the numbered
/// `$1, $2, ...` form Postgres expects, so queries can be written in the
/// more readable positional style.
pub fn sql(query: &str) -> String {
    let cleaned = query.split_whitespace().collect::<Vec<&str>>().join(" ");
    let re = Regex::new(r"\?").unwrap();
    let mut param_index = 0;
    re.replace_all(&cleaned, |_: &regex::Captures| {
        param_index += 1;
        format!("${}", param_index)
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::sql;
    use pretty_assertions::assert_eq;

    #[test]
    fn numbers_placeholders_in_order() {
        assert_eq!(
            sql("SELECT * FROM users WHERE id = ? AND role = ?"),
            "SELECT * FROM users WHERE id = $1 AND role = $2"
        );
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(
            sql("SELECT\n    id\nFROM\n    users"),
            "SELECT id FROM users"
        );
    }
}
