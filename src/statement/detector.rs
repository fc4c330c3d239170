//! Lightweight SQL statement classification.
//!
//! Only the leading tokens of a statement are inspected: enough to tell the
//! statement kind, the DML target table and whether a `RETURNING` clause is
//! already present. Comments, quoted identifiers and string literals are
//! tokenized so that keywords inside them are never mistaken for syntax.

use std::fmt;

/// Kind of an SQL statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    UpdateOrInsert,
    Merge,
    ExecuteProcedure,
    Commit,
    Rollback,
    SetTransaction,
    Other,
}

impl StatementKind {
    /// Transaction management statement kind, if any.
    pub fn tx_statement(&self) -> Option<TxStatementKind> {
        match self {
            StatementKind::Commit => Some(TxStatementKind::Commit),
            StatementKind::Rollback => Some(TxStatementKind::Rollback),
            StatementKind::SetTransaction => Some(TxStatementKind::SetTransaction),
            _ => None,
        }
    }
}

/// Transaction management statements recognised by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxStatementKind {
    Commit,
    Rollback,
    SetTransaction,
}

impl fmt::Display for TxStatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TxStatementKind::Commit => write!(f, "COMMIT"),
            TxStatementKind::Rollback => write!(f, "ROLLBACK"),
            TxStatementKind::SetTransaction => write!(f, "SET TRANSACTION"),
        }
    }
}

/// Result of classifying a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementInfo {
    pub kind: StatementKind,
    /// DML target table; unquoted names are upper-cased.
    pub table_name: Option<String>,
    /// Whether the statement already ends in a `RETURNING` clause.
    pub has_returning: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Unquoted identifier or keyword, as written.
    Word(String),
    /// Double-quoted identifier with the quotes removed.
    Quoted(String),
    Literal,
    Number,
    Symbol(char),
}

impl Token {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    fn identifier(&self) -> Option<String> {
        match self {
            Token::Word(w) => Some(w.to_ascii_uppercase()),
            Token::Quoted(q) => Some(q.clone()),
            _ => None,
        }
    }
}

fn tokenize(sql: &str) -> Vec<Token> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            i += 2;
        } else if c == '\'' || c == '"' {
            let mut content = String::new();
            i += 1;
            while i < chars.len() {
                if chars[i] == c {
                    // doubled quote is an escaped quote
                    if chars.get(i + 1) == Some(&c) {
                        content.push(c);
                        i += 2;
                        continue;
                    }
                    break;
                }
                content.push(chars[i]);
                i += 1;
            }
            i += 1;
            tokens.push(if c == '"' {
                Token::Quoted(content)
            } else {
                Token::Literal
            });
        } else if c.is_alphabetic() {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else if c.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                i += 1;
            }
            tokens.push(Token::Number);
        } else {
            tokens.push(Token::Symbol(c));
            i += 1;
        }
    }
    tokens
}

/// Whether the remaining tokens are empty or a single statement terminator.
fn at_end(rest: &[Token]) -> bool {
    matches!(rest, [] | [Token::Symbol(';')])
}

fn has_returning(tokens: &[Token]) -> bool {
    let mut depth = 0i32;
    for token in tokens {
        match token {
            Token::Symbol('(') => depth += 1,
            Token::Symbol(')') => depth -= 1,
            t if depth == 0 && t.is_keyword("RETURNING") => return true,
            _ => {}
        }
    }
    false
}

/// Classify an SQL statement.
pub fn classify(sql: &str) -> StatementInfo {
    let tokens = tokenize(sql);
    let mut info = StatementInfo {
        kind: StatementKind::Other,
        table_name: None,
        has_returning: false,
    };

    let Some(first) = tokens.first() else {
        return info;
    };
    let rest = &tokens[1..];

    // index of the token holding the DML target table
    let target = if first.is_keyword("SELECT") || first.is_keyword("WITH") {
        info.kind = StatementKind::Select;
        None
    } else if first.is_keyword("INSERT") {
        rest.first().filter(|t| t.is_keyword("INTO")).map(|_| {
            info.kind = StatementKind::Insert;
            2
        })
    } else if first.is_keyword("UPDATE") {
        if rest.first().is_some_and(|t| t.is_keyword("OR")) {
            rest.get(1).filter(|t| t.is_keyword("INSERT")).and_then(|_| {
                rest.get(2).filter(|t| t.is_keyword("INTO")).map(|_| {
                    info.kind = StatementKind::UpdateOrInsert;
                    4
                })
            })
        } else {
            info.kind = StatementKind::Update;
            Some(1)
        }
    } else if first.is_keyword("DELETE") {
        rest.first().filter(|t| t.is_keyword("FROM")).map(|_| {
            info.kind = StatementKind::Delete;
            2
        })
    } else if first.is_keyword("MERGE") {
        rest.first().filter(|t| t.is_keyword("INTO")).map(|_| {
            info.kind = StatementKind::Merge;
            2
        })
    } else if first.is_keyword("EXECUTE") {
        if rest.first().is_some_and(|t| t.is_keyword("PROCEDURE")) {
            info.kind = StatementKind::ExecuteProcedure;
        }
        None
    } else if first.is_keyword("COMMIT") || first.is_keyword("ROLLBACK") {
        let rest = match rest.first() {
            Some(t) if t.is_keyword("WORK") => &rest[1..],
            _ => rest,
        };
        if at_end(rest) {
            info.kind = if first.is_keyword("COMMIT") {
                StatementKind::Commit
            } else {
                StatementKind::Rollback
            };
        }
        None
    } else if first.is_keyword("SET") {
        if rest.first().is_some_and(|t| t.is_keyword("TRANSACTION")) {
            info.kind = StatementKind::SetTransaction;
        }
        None
    } else {
        None
    };

    if let Some(idx) = target {
        match tokens.get(idx).and_then(Token::identifier) {
            Some(table) => {
                info.table_name = Some(table);
                info.has_returning = has_returning(&tokens[idx + 1..]);
            }
            None => info.kind = StatementKind::Other,
        }
    }
    info
}
