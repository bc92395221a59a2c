//! Markdown data dictionary for a diagram.

use crate::measure::{column_widths, pad_right};
use crate::model::{Column, Diagram, Relationship, Table};
use std::fmt::Write;

const HEADER: [&str; 6] = ["Column", "Type", "Nullable", "Key", "Default", "Comment"];

/// Render `diagram` as Markdown, tables in authored order.
pub fn render_markdown(diagram: &Diagram) -> String {
    DocsGenerator::new(diagram).generate()
}

pub struct DocsGenerator<'a> {
    diagram: &'a Diagram,
    output: String,
}

impl<'a> DocsGenerator<'a> {
    #[must_use]
    pub fn new(diagram: &'a Diagram) -> Self {
        Self {
            diagram,
            output: String::new(),
        }
    }

    #[must_use]
    pub fn generate(mut self) -> String {
        self.generate_header();
        for table in &self.diagram.tables {
            self.generate_table(table);
        }
        self.output
    }

    fn generate_header(&mut self) {
        writeln!(self.output, "# Data Dictionary\n").unwrap();
        writeln!(
            self.output,
            "{} tables, {} relationships.\n",
            self.diagram.tables.len(),
            self.diagram.relationships.len()
        )
        .unwrap();

        if self.diagram.tables.is_empty() {
            return;
        }
        writeln!(self.output, "## Tables\n").unwrap();
        for table in &self.diagram.tables {
            writeln!(self.output, "- [{}](#{})", table.name, anchor(&table.name)).unwrap();
        }
        writeln!(self.output).unwrap();
    }

    fn generate_table(&mut self, table: &Table) {
        writeln!(self.output, "## {}\n", table.name).unwrap();
        if let Some(comment) = &table.comment {
            writeln!(self.output, "{comment}\n").unwrap();
        }

        let rows: Vec<Vec<String>> = table.columns.iter().map(column_row).collect();
        let widths = column_widths(&HEADER, &rows);

        let header: Vec<String> = HEADER.iter().map(|h| h.to_string()).collect();
        self.write_row(&header, &widths);
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        self.write_row(&rule, &widths);
        for row in &rows {
            self.write_row(row, &widths);
        }
        writeln!(self.output).unwrap();

        let incoming: Vec<&Relationship> = self
            .diagram
            .relationships
            .iter()
            .filter(|r| r.to_table == table.name && r.from_table != table.name)
            .collect();
        if table.relationships.is_empty() && incoming.is_empty() {
            return;
        }

        writeln!(self.output, "### Relationships\n").unwrap();
        for rel in &table.relationships {
            writeln!(self.output, "- References {}", describe(rel)).unwrap();
        }
        for rel in incoming {
            writeln!(self.output, "- Referenced by {}", describe(rel)).unwrap();
        }
        writeln!(self.output).unwrap();
    }

    fn write_row(&mut self, cells: &[String], widths: &[usize]) {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| pad_right(cell, *width))
            .collect();
        writeln!(self.output, "| {} |", padded.join(" | ")).unwrap();
    }
}

fn column_row(column: &Column) -> Vec<String> {
    let mut keys = Vec::new();
    if column.is_primary_key {
        keys.push("PK");
    }
    if column.is_foreign_key {
        keys.push("FK");
    }
    if column.is_unique {
        keys.push("UQ");
    }
    if column.is_indexed {
        keys.push("IDX");
    }

    vec![
        column.name.clone(),
        column.abstract_type.clone(),
        if column.nullable && !column.is_primary_key { "YES" } else { "NO" }.to_string(),
        keys.join(", "),
        column.default_value.clone().unwrap_or_default(),
        column.comment.as_deref().unwrap_or_default().replace('|', "\\|"),
    ]
}

fn describe(rel: &Relationship) -> String {
    format!(
        "`{}.{}` → `{}.{}` ({}, ON DELETE {}, ON UPDATE {})",
        rel.from_table,
        rel.from_column,
        rel.to_table,
        rel.to_column,
        rel.cardinality.as_str(),
        rel.on_delete(),
        rel.on_update()
    )
}

fn anchor(name: &str) -> String {
    name.to_lowercase().replace(['_', ' '], "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReferentialAction;

    fn diagram() -> Diagram {
        let mut categories = Table::new(
            "categories",
            vec![Column::primary("id", "int"), Column::new("name", "varchar(80)").not_null()],
        );
        categories.comment = Some("Product categories".to_string());
        let mut rel = Relationship::new("products", "category_id", "categories", "id");
        rel.on_delete = Some(ReferentialAction::Cascade);

        Diagram::new(
            vec![
                categories,
                Table::new(
                    "products",
                    vec![
                        Column::primary("id", "int"),
                        Column::new("category_id", "int").not_null(),
                    ],
                ),
            ],
            vec![rel],
        )
    }

    #[test]
    fn test_aligned_column_table() {
        let md = render_markdown(&diagram());
        let expected = "\
| Column | Type        | Nullable | Key | Default | Comment |
| ------ | ----------- | -------- | --- | ------- | ------- |
| id     | int         | NO       | PK  |         |         |
| name   | varchar(80) | NO       |     |         |         |
";
        assert!(md.contains(expected), "{md}");
    }

    #[test]
    fn test_relationships_listed_both_ways() {
        let md = render_markdown(&diagram());
        let line = "`products.category_id` → `categories.id` (one-to-many, ON DELETE CASCADE, ON UPDATE RESTRICT)";
        assert!(md.contains(&format!("- Referenced by {line}")));
        assert!(md.contains(&format!("- References {line}")));
    }

    #[test]
    fn test_header_and_toc() {
        let md = render_markdown(&diagram());
        assert!(md.starts_with("# Data Dictionary\n\n2 tables, 1 relationships.\n"));
        assert!(md.contains("- [categories](#categories)"));
        assert!(md.contains("## categories\n\nProduct categories\n"));
    }

    #[test]
    fn test_empty_diagram() {
        assert_eq!(
            render_markdown(&Diagram::default()),
            "# Data Dictionary\n\n0 tables, 0 relationships.\n\n"
        );
    }
}
