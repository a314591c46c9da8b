use crate::query::{
    ast::expr::Expr,
    renderer::{Render, Renderer},
};

impl Render for Expr {
    fn render(&self, r: &mut Renderer) {
        match self {
            Expr::Identifier(ident) => {
                let quoted = r.dialect.quote_identifier(&ident.name);
                r.sql.push_str(&quoted);
            }
            Expr::Value(value) => {
                let literal = r.dialect.render_literal(value);
                r.sql.push_str(&literal);
            }
            Expr::BinaryOp(op) => {
                let nested = |e: &Expr| matches!(e, Expr::BinaryOp(_));

                if nested(&op.left) {
                    r.sql.push('(');
                    op.left.render(r);
                    r.sql.push(')');
                } else {
                    op.left.render(r);
                }

                r.sql.push(' ');
                r.sql.push_str(op.op.as_sql());
                r.sql.push(' ');

                if nested(&op.right) {
                    r.sql.push('(');
                    op.right.render(r);
                    r.sql.push(')');
                } else {
                    op.right.render(r);
                }
            }
        }
    }
}
