// Source substitution
//
// Produces the command one source of a multi-source model executes: every
// reference to the model's pseudo column becomes the source name as a
// string literal, and the result is handed to the constant folder.

use std::sync::Arc;

use crate::error::{FederationError, Result};
use crate::models::visit::rewrite_command;
use crate::models::{
    Command, DerivedColumn, Expression, Insert, InsertSource, Literal, MultiSourceModel,
    QueryExpression, TableReference, Value,
};

use super::catalog::MultiSourceCatalog;
use super::folding::ConstantFolder;

pub struct SourceSubstitutionRewriter {
    catalog: Arc<dyn MultiSourceCatalog>,
    folder: Arc<dyn ConstantFolder>,
}

impl SourceSubstitutionRewriter {
    pub fn new(catalog: Arc<dyn MultiSourceCatalog>, folder: Arc<dyn ConstantFolder>) -> Self {
        Self { catalog, folder }
    }

    /// Copy of `command` as executed by `source_name`. The input is never
    /// modified.
    pub fn substitute(
        &self,
        command: &Command,
        model: &MultiSourceModel,
        source_name: &str,
    ) -> Result<Command> {
        let mut command = command.clone();

        match &mut command {
            Command::Insert(insert) => self.restrict_insert(insert, model, source_name)?,
            Command::Update(update) => {
                for clause in &update.set {
                    if self.catalog.is_pseudo_column(model, &clause.column)? {
                        return Err(FederationError::planning(
                            &model.name,
                            format!("cannot update pseudo column {}", model.pseudo_column),
                        ));
                    }
                }
            }
            Command::Select(select) => {
                self.keep_output_names(&mut select.projection, model)?;
                for table in select.from.iter_mut() {
                    self.keep_names_in_table(table, model)?;
                }
            }
            Command::SetOp(set_op) => {
                self.keep_names_in_query(&mut set_op.left, model)?;
                self.keep_names_in_query(&mut set_op.right, model)?;
            }
            Command::Delete(_) | Command::Call(_) => {}
        }

        let catalog = self.catalog.as_ref();
        rewrite_command(&mut command, &mut |expr| {
            let is_pseudo = match &*expr {
                Expression::ColumnRef(column) => catalog.is_pseudo_column(model, column)?,
                _ => false,
            };
            if is_pseudo {
                *expr = Expression::literal(Literal::string(source_name));
            }
            Ok(())
        })?;

        self.folder.fold(command)
    }

    /// Keep only the rows addressed to `source_name` and drop the pseudo
    /// column from the insert
    fn restrict_insert(
        &self,
        insert: &mut Insert,
        model: &MultiSourceModel,
        source_name: &str,
    ) -> Result<()> {
        let mut position = None;
        for (idx, column) in insert.columns.iter().enumerate() {
            if self.catalog.is_pseudo_column(model, column)? {
                position = Some(idx);
                break;
            }
        }
        let Some(position) = position else {
            return Ok(());
        };

        let rows = match &mut insert.source {
            InsertSource::Values(rows) => rows,
            InsertSource::Query(_) => {
                return Err(FederationError::planning(
                    &model.name,
                    format!(
                        "INSERT with a query expression cannot target pseudo column {}",
                        model.pseudo_column
                    ),
                ));
            }
        };

        let mut kept = Vec::with_capacity(rows.len());
        for mut row in rows.drain(..) {
            if position >= row.len() {
                return Err(FederationError::planning(
                    &model.name,
                    "INSERT row is shorter than its column list",
                ));
            }
            let target = match row[position].as_literal().map(|l| &l.value) {
                Some(Value::String(target)) => target.clone(),
                _ => {
                    return Err(FederationError::planning(
                        &model.name,
                        format!("value for {} must be a string literal", model.pseudo_column),
                    ));
                }
            };
            if target == source_name {
                row.remove(position);
                kept.push(row);
            }
        }
        *rows = kept;
        insert.columns.remove(position);
        Ok(())
    }

    /// Alias projected pseudo column references so the output keeps its
    /// name once the reference becomes a literal
    fn keep_output_names(
        &self,
        projection: &mut [DerivedColumn],
        model: &MultiSourceModel,
    ) -> Result<()> {
        for column in projection.iter_mut() {
            if column.alias.is_some() {
                continue;
            }
            if let Expression::ColumnRef(reference) = &column.expression {
                if self.catalog.is_pseudo_column(model, reference)? {
                    column.alias = Some(reference.name.clone());
                }
            }
        }
        Ok(())
    }

    fn keep_names_in_query(&self, query: &mut QueryExpression, model: &MultiSourceModel) -> Result<()> {
        match query {
            QueryExpression::Select(select) => {
                self.keep_output_names(&mut select.projection, model)?;
                for table in select.from.iter_mut() {
                    self.keep_names_in_table(table, model)?;
                }
                Ok(())
            }
            QueryExpression::SetOp(set_op) => {
                self.keep_names_in_query(&mut set_op.left, model)?;
                self.keep_names_in_query(&mut set_op.right, model)
            }
        }
    }

    fn keep_names_in_table(&self, table: &mut TableReference, model: &MultiSourceModel) -> Result<()> {
        match table {
            TableReference::Group(_) => Ok(()),
            TableReference::Join(join) => {
                self.keep_names_in_table(&mut join.left, model)?;
                self.keep_names_in_table(&mut join.right, model)
            }
            TableReference::Derived(derived) => self.keep_names_in_query(&mut derived.query, model),
        }
    }
}
