//! Round-trip checks for rendered statements.

use sqlparser::ast::Statement;
use sqlparser::parser::Parser;

use super::dialect::Dialect;

/// Parse `sql` with the dialect's own parser, expecting exactly one statement.
pub fn parse_statement(sql: &str, dialect: Dialect) -> Result<Statement, String> {
    let parser_dialect = dialect.parser_dialect();
    let mut statements = Parser::parse_sql(&*parser_dialect, sql)
        .map_err(|e| format!("{} rejected SQL: {}\n{}", dialect, e, sql))?;

    match statements.len() {
        1 => Ok(statements.remove(0)),
        n => Err(format!("expected one statement, found {}\n{}", n, sql)),
    }
}

/// Panic with the offending SQL unless it parses as a single SELECT.
#[track_caller]
pub fn assert_parses(sql: &str, dialect: Dialect) {
    match parse_statement(sql, dialect) {
        Ok(Statement::Query(_)) => {}
        Ok(other) => panic!("expected a query, parsed {:?}", other),
        Err(message) => panic!("{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_dialect_quoting() {
        assert_parses("SELECT \"a\".\"x\" FROM \"a\"", Dialect::Postgres);
        assert_parses("SELECT `a`.`x` FROM `a`", Dialect::MySql);
        assert_parses("SELECT [a].[x] FROM [dbo].[a]", Dialect::TSql);
    }

    #[test]
    fn test_rejects_garbage_and_batches() {
        assert!(parse_statement("SELEC x FORM a", Dialect::Postgres).is_err());
        assert!(parse_statement("SELECT 1; SELECT 2", Dialect::DuckDb).is_err());
    }
}
