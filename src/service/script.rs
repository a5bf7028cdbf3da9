// Copyright 2023 Remi Bernotavicius

//! Turns an SQL script into individual statements. This is only good enough for the scripts we
//! ship: `-- ` comments are recognized only as single-line comments, and a `;` inside a string
//! literal still ends the statement.

fn remove_comments(content: &str) -> String {
    let mut content = content.to_owned();
    while let Some(start) = content.find("-- ") {
        match content[start..].find('\n') {
            Some(eol) => content.replace_range(start..=start + eol, ""),
            None => content.truncate(start),
        }
    }
    content
}

fn collapse_whitespace(content: &str) -> String {
    let mut collapsed = String::with_capacity(content.len());
    let mut in_whitespace = false;
    for c in content.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                collapsed.push(' ');
            }
            in_whitespace = true;
        } else {
            collapsed.push(c);
            in_whitespace = false;
        }
    }
    collapsed
}

/// Splits on every `;`. Statements are trimmed. Whatever follows the last `;` is kept only if it
/// isn't blank.
pub fn sql_statements(content: &str) -> Vec<String> {
    let content = collapse_whitespace(&remove_comments(content));

    let mut statements = vec![];
    let mut rest = content.as_str();
    loop {
        match rest.split_once(';') {
            Some((statement, tail)) => {
                statements.push(statement.trim().to_owned());
                rest = tail;
            }
            None => {
                if !rest.trim().is_empty() {
                    statements.push(rest.trim().to_owned());
                }
                break;
            }
        }
    }
    statements
}

#[test]
fn comments_are_removed() {
    assert_eq!(remove_comments("a -- one\nb"), "a b");
    assert_eq!(remove_comments("-- one\n-- two\nc"), "c");
    assert_eq!(remove_comments("a -- trailing"), "a ");
    // Without the space it isn't a comment.
    assert_eq!(remove_comments("a --b\n"), "a --b\n");
}

#[test]
fn whitespace_is_collapsed() {
    assert_eq!(collapse_whitespace("a \n\t b\r\n\nc"), "a b c");
    assert_eq!(collapse_whitespace("  a  "), " a ");
}

#[test]
fn split_into_statements() {
    let script = "
        -- make a table
        CREATE TABLE t (
          x INTEGER -- the x
        );
        INSERT INTO t (x) VALUES (1);
    ";
    assert_eq!(
        sql_statements(script),
        ["CREATE TABLE t ( x INTEGER )", "INSERT INTO t (x) VALUES (1)"]
    );
}

#[test]
fn trailing_fragment() {
    assert_eq!(sql_statements("SELECT 1; SELECT 2"), ["SELECT 1", "SELECT 2"]);
    assert_eq!(sql_statements("SELECT 1;  \n "), ["SELECT 1"]);
    assert_eq!(sql_statements(""), Vec::<String>::new());
}

#[test]
fn naive_about_semicolons() {
    assert_eq!(sql_statements("SELECT 1;;SELECT 2;"), ["SELECT 1", "", "SELECT 2"]);
    assert_eq!(
        sql_statements("INSERT INTO t VALUES ('a;b');"),
        ["INSERT INTO t VALUES ('a", "b')"]
    );
}
