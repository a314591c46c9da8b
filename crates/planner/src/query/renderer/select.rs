use crate::query::{
    ast::{common::OrderDir, select::Select},
    renderer::{Render, Renderer},
};

impl Render for Select {
    fn render(&self, r: &mut Renderer) {
        r.sql.push_str("SELECT ");
        if self.columns.is_empty() {
            r.sql.push('*');
        } else {
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                col.render(r);
            }
        }

        r.sql.push_str(" FROM ");
        let table = r.dialect.render_table(&self.from);
        r.sql.push_str(&table);

        if let Some(cond) = &self.where_clause {
            r.sql.push_str(" WHERE ");
            cond.render(r);
        }

        if !self.order_by.is_empty() {
            r.sql.push_str(" ORDER BY ");
            for (i, ob) in self.order_by.iter().enumerate() {
                if i > 0 {
                    r.sql.push_str(", ");
                }
                ob.expr.render(r);
                match ob.direction {
                    Some(OrderDir::Asc) => r.sql.push_str(" ASC"),
                    Some(OrderDir::Desc) => r.sql.push_str(" DESC"),
                    None => {}
                }
            }
        }

        if let Some(limit) = self.limit {
            r.sql.push_str(&format!(" LIMIT {limit}"));
        }

        if let Some(offset) = self.offset {
            r.sql.push_str(&format!(" OFFSET {offset}"));
        }
    }
}
