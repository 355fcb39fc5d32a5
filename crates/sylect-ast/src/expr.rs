//! Expression nodes.
//!
//! Expressions are three-tiered, mirroring how the compiler lowers them:
//!
//! ```text
//! Expr      := AndExpr ('||' AndExpr)*
//! AndExpr   := MathExpr ('&&' MathExpr)*
//! MathExpr  := Term (BinaryOp Term)*
//! Term      := UnaryOp* (Literal | Chain | '(' Expr ')')
//! Chain     := ChainLink ('.' ChainLink)*
//! ```
//!
//! Precedence inside a `MathExpr` is not encoded in the tree; the compiler
//! applies it while emitting.

use sylect_core::Span;

use crate::decl::Ident;
use crate::ops::{BinaryOp, UnaryOp};

/// A literal exactly as written: `42`, `7L`, `1.5F`, `2.0`, `"text"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub text: String,
    pub span: Span,
}

impl Literal {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            span: Span::default(),
        }
    }

    /// A quoted string literal for `value` (no escaping is applied).
    pub fn string(value: &str) -> Self {
        Self::new(format!("\"{value}\""))
    }

    pub fn is_string(&self) -> bool {
        self.text.len() >= 2 && self.text.starts_with('"') && self.text.ends_with('"')
    }
}

/// OR-level expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub terms: Vec<AndExpr>,
    pub span: Span,
}

/// AND-level expression.
#[derive(Debug, Clone, PartialEq)]
pub struct AndExpr {
    pub terms: Vec<MathExpr>,
    pub span: Span,
}

/// A flat sequence of terms joined by binary operators.
#[derive(Debug, Clone, PartialEq)]
pub struct MathExpr {
    pub first: Term,
    pub rest: Vec<(BinaryOp, Term)>,
    pub span: Span,
}

/// An operand with its prefix operators.
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    /// Applied in order: the first operator binds tightest.
    pub unary: Vec<UnaryOp>,
    pub operand: Operand,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Literal),
    Chain(Chain),
    Paren(Box<Expr>),
}

/// A dotted access chain: `a.b.c(1).d`.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub links: Vec<ChainLink>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChainLink {
    /// String literal receiver; only valid as the first link.
    Str(Literal),
    /// Local, field, or class name.
    Name(Ident),
    /// Method call, constructor call, or `constructor(...)`.
    Call(CallLink),
    /// `super`; only valid as the first link.
    Super(Span),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallLink {
    pub name: Ident,
    pub args: Vec<Expr>,
    pub span: Span,
}

impl ChainLink {
    pub fn name(name: &str) -> Self {
        Self::Name(Ident::new(name))
    }

    pub fn call(name: &str, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::Call(CallLink {
            name: Ident::new(name),
            args: args.into_iter().collect(),
            span: Span::default(),
        })
    }

    pub fn string(value: &str) -> Self {
        Self::Str(Literal::string(value))
    }

    pub fn span(&self) -> Span {
        match self {
            Self::Str(lit) => lit.span,
            Self::Name(ident) => ident.span,
            Self::Call(call) => call.span,
            Self::Super(span) => *span,
        }
    }
}

// ============================================================================
// Construction helpers
// ============================================================================

impl Term {
    pub fn new(operand: Operand) -> Self {
        Self {
            unary: Vec::new(),
            operand,
            span: Span::default(),
        }
    }

    pub fn lit(text: &str) -> Self {
        Self::new(Operand::Literal(Literal::new(text)))
    }

    pub fn name(name: &str) -> Self {
        Self::chain([ChainLink::name(name)])
    }

    pub fn call(name: &str, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::chain([ChainLink::call(name, args)])
    }

    pub fn chain(links: impl IntoIterator<Item = ChainLink>) -> Self {
        Self::new(Operand::Chain(Chain {
            links: links.into_iter().collect(),
            span: Span::default(),
        }))
    }

    pub fn paren(expr: Expr) -> Self {
        Self::new(Operand::Paren(Box::new(expr)))
    }

    /// Add an outer prefix operator.
    pub fn prefixed(mut self, op: UnaryOp) -> Self {
        self.unary.push(op);
        self
    }
}

impl MathExpr {
    pub fn new(first: Term) -> Self {
        Self {
            first,
            rest: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn then(mut self, op: BinaryOp, term: Term) -> Self {
        self.rest.push((op, term));
        self
    }
}

impl Expr {
    /// `a || b || ...`
    pub fn any(terms: impl IntoIterator<Item = AndExpr>) -> Self {
        Self {
            terms: terms.into_iter().collect(),
            span: Span::default(),
        }
    }

    /// `a && b && ...` as a complete expression.
    pub fn all(terms: impl IntoIterator<Item = MathExpr>) -> Self {
        Self::from(AndExpr {
            terms: terms.into_iter().collect(),
            span: Span::default(),
        })
    }

    pub fn lit(text: &str) -> Self {
        Self::from(Term::lit(text))
    }

    pub fn string(value: &str) -> Self {
        Self::from(Term::new(Operand::Literal(Literal::string(value))))
    }

    pub fn name(name: &str) -> Self {
        Self::from(Term::name(name))
    }

    pub fn call(name: &str, args: impl IntoIterator<Item = Expr>) -> Self {
        Self::from(Term::call(name, args))
    }

    pub fn chain(links: impl IntoIterator<Item = ChainLink>) -> Self {
        Self::from(Term::chain(links))
    }

    /// `left op right`
    pub fn binary(left: Term, op: BinaryOp, right: Term) -> Self {
        Self::from(MathExpr::new(left).then(op, right))
    }

    /// The single math expression if this is not a boolean combination.
    pub fn as_math(&self) -> Option<&MathExpr> {
        match self.terms.as_slice() {
            [and] => match and.terms.as_slice() {
                [math] => Some(math),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn at(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

impl From<Term> for MathExpr {
    fn from(term: Term) -> Self {
        MathExpr::new(term)
    }
}

impl From<MathExpr> for AndExpr {
    fn from(math: MathExpr) -> Self {
        let span = math.span;
        AndExpr {
            terms: vec![math],
            span,
        }
    }
}

impl From<AndExpr> for Expr {
    fn from(and: AndExpr) -> Self {
        let span = and.span;
        Expr {
            terms: vec![and],
            span,
        }
    }
}

impl From<MathExpr> for Expr {
    fn from(math: MathExpr) -> Self {
        Expr::from(AndExpr::from(math))
    }
}

impl From<Term> for Expr {
    fn from(term: Term) -> Self {
        Expr::from(MathExpr::from(term))
    }
}
