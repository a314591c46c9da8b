use model::core::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(Ident),
    Value(Value),
    BinaryOp(Box<BinaryOp>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryOp {
    pub left: Expr,
    pub op: BinaryOperator,
    pub right: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Gt,
    GtEq,
    Lt,
    And,
    Or,
}

impl BinaryOperator {
    pub fn as_sql(&self) -> &'static str {
        match self {
            BinaryOperator::Eq => "=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::Lt => "<",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
        }
    }
}
