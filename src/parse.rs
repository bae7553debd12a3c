use std::str::FromStr;

use symbolic_expressions::{parser::parse_str, Sexp, SexpError};
use thiserror::Error;

use crate::{ENodeOrVar, FromOpError, Id, MigLanguage, Pattern, RecExpr, Var};

/// An error resulting from parsing a [`Pattern`] or [`RecExpr`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// The string is not a well-formed s-expression.
    #[error(transparent)]
    Sexp(#[from] SexpError),
    /// An empty list `()` where a term was expected.
    #[error("found empty s-expression")]
    EmptySexp,
    /// A list whose head is itself a list.
    #[error("expected operator, found {0}")]
    HeadList(Sexp),
    /// An operator with the wrong arity or an unknown name.
    #[error(transparent)]
    BadOp(#[from] FromOpError),
    /// A pattern variable where a ground expression was expected.
    #[error("found pattern variable {0} in a ground expression")]
    UnexpectedVar(Var),
}

fn parse_sexp_into(sexp: &Sexp, ast: &mut RecExpr<ENodeOrVar>) -> Result<Id, ParseError> {
    match sexp {
        Sexp::Empty => Err(ParseError::EmptySexp),
        Sexp::String(s) => {
            let node = match s.parse::<Var>() {
                Ok(var) => ENodeOrVar::Var(var),
                Err(_) => ENodeOrVar::ENode(MigLanguage::from_op(s, vec![])?),
            };
            Ok(ast.add(node))
        }
        Sexp::List(list) if list.is_empty() => Err(ParseError::EmptySexp),
        Sexp::List(list) => match &list[0] {
            Sexp::Empty => Err(ParseError::EmptySexp),
            list @ Sexp::List(..) => Err(ParseError::HeadList(list.to_owned())),
            Sexp::String(op) => {
                let children: Vec<Id> = list[1..]
                    .iter()
                    .map(|s| parse_sexp_into(s, ast))
                    .collect::<Result<_, _>>()?;
                let node = MigLanguage::from_op(op, children)?;
                Ok(ast.add(ENodeOrVar::ENode(node)))
            }
        },
    }
}

impl FromStr for Pattern {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sexp = parse_str(s.trim())?;
        let mut ast = RecExpr::default();
        parse_sexp_into(&sexp, &mut ast)?;
        Ok(Pattern::new(ast))
    }
}

impl FromStr for RecExpr<MigLanguage> {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pattern: Pattern = s.parse()?;
        let nodes = pattern
            .ast
            .as_ref()
            .iter()
            .map(|n| match n {
                ENodeOrVar::ENode(n) => Ok(*n),
                ENodeOrVar::Var(v) => Err(ParseError::UnexpectedVar(*v)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RecExpr::from(nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_parse() {
        let mut expected = RecExpr::default();
        let x0 = expected.add(MigLanguage::Input(0));
        let f = expected.add(MigLanguage::False);
        let t = expected.add(MigLanguage::Not(f));
        let x0b = expected.add(MigLanguage::Input(0));
        expected.add(MigLanguage::Maj([x0, t, x0b]));

        let expr: RecExpr<MigLanguage> = "(maj x0 (! false) x0)".parse().unwrap();
        assert_eq!(expr, expected);
        assert_eq!(expr.to_string(), "(maj x0 (! false) x0)");
    }

    #[test]
    fn parse_errors() {
        assert!(matches!("()".parse::<Pattern>(), Err(ParseError::EmptySexp)));
        assert!(matches!(
            "(maj x0 x1)".parse::<Pattern>(),
            Err(ParseError::BadOp(_))
        ));
        assert!(matches!(
            "((maj) x0 x1 x2)".parse::<Pattern>(),
            Err(ParseError::HeadList(_))
        ));
        assert!(matches!(
            "(! ?a)".parse::<RecExpr<MigLanguage>>(),
            Err(ParseError::UnexpectedVar(_))
        ));
        assert!("(maj ?a (! ?b) false)".parse::<Pattern>().is_ok());
    }
}
