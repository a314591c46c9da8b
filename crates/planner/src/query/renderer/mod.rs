//! Defines the core rendering trait and context for converting AST to SQL.

use crate::query::dialect::Dialect;

pub mod expr;
pub mod select;

/// A trait for any AST node that can be rendered into a SQL string.
pub trait Render {
    fn render(&self, renderer: &mut Renderer);
}

/// Accumulates SQL text; the dialect supplies quoting and literal syntax.
pub struct Renderer<'a> {
    pub sql: String,
    pub dialect: &'a dyn Dialect,
}

impl<'a> Renderer<'a> {
    pub fn new(dialect: &'a dyn Dialect) -> Self {
        Self {
            sql: String::new(),
            dialect,
        }
    }

    pub fn finish(self) -> String {
        self.sql
    }
}

/// Renders any node to a standalone SQL string.
pub fn to_sql(node: &impl Render, dialect: &dyn Dialect) -> String {
    let mut renderer = Renderer::new(dialect);
    node.render(&mut renderer);
    renderer.finish()
}
