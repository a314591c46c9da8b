use crate::query::ast::{
    common::{OrderDir, TableRef},
    expr::{BinaryOp, BinaryOperator, Expr},
    select::{OrderByExpr, Select},
};

/// Fluent construction of a [`Select`] over a single table.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    pub ast: Select,
}

impl SelectBuilder {
    /// `SELECT * FROM <table>`
    pub fn from(table: TableRef) -> Self {
        Self {
            ast: Select {
                columns: Vec::new(),
                from: table,
                where_clause: None,
                order_by: Vec::new(),
                limit: None,
                offset: None,
            },
        }
    }

    /// Adds a predicate, AND-ing it with any existing one.
    pub fn filter(mut self, cond: Expr) -> Self {
        self.ast.where_clause = Some(match self.ast.where_clause.take() {
            Some(existing) => Expr::BinaryOp(Box::new(BinaryOp {
                left: existing,
                op: BinaryOperator::And,
                right: cond,
            })),
            None => cond,
        });
        self
    }

    pub fn order_by(mut self, expr: Expr, direction: Option<OrderDir>) -> Self {
        self.ast.order_by.push(OrderByExpr { expr, direction });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.ast.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.ast.offset = Some(offset);
        self
    }

    pub fn build(self) -> Select {
        self.ast
    }
}
