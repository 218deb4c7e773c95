use common::logical_plan::*;
use common::{get_name, Field, MiniRelError};
use filestore::FileCatalog;
use sqlparser::ast::{
    BinaryOperator, Expr, JoinConstraint, JoinOperator, SelectItem, SetExpr, Statement,
    TableFactor, Value,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

/// Translates a parsed SELECT statement to a LogicalPlan.
/// Validates the columns and tables referenced using the catalog.
/// Shares lifetime 'a with the catalog.
///
/// Only conjunctive SELECT ... FROM ... WHERE queries are supported:
/// comma-separated FROM lists fold into a left-deep cartesian chain, and
/// `INNER JOIN ... ON` desugars to a cartesian product plus an extra
/// conjunct. Column references are validated but never rewritten, so an
/// unqualified column stays unqualified and resolves by wildcard matching
/// during execution.
pub struct TranslateAndValidate<'a> {
    /// Logical plan of operators encountered so far.
    plan: LogicalPlan,
    /// Catalog to validate the translations.
    catalog: &'a FileCatalog,
    /// List of tables encountered. Used for field validation.
    tables: Vec<String>,
}

impl<'a> TranslateAndValidate<'a> {
    /// Creates a new TranslateAndValidate object.
    fn new(catalog: &'a FileCatalog) -> Self {
        Self {
            plan: LogicalPlan::new(),
            catalog,
            tables: Vec::new(),
        }
    }

    /// Parses SQL text and translates the single SELECT statement within.
    ///
    /// # Arguments
    ///
    /// * `sql` - Query text.
    /// * `catalog` - Catalog for validation.
    pub fn from_sql_str(sql: &str, catalog: &'a FileCatalog) -> Result<LogicalPlan, MiniRelError> {
        let dialect = GenericDialect {};
        let statements = Parser::parse_sql(&dialect, sql.to_string())
            .map_err(|e| MiniRelError::ValidationError(format!("SQL parse error: {:?}", e)))?;
        if statements.len() != 1 {
            return Err(MiniRelError::ValidationError(String::from(
                "Expected a single SELECT statement",
            )));
        }
        match &statements[0] {
            Statement::Query(q) => Self::from_sql(q, catalog),
            _ => Err(MiniRelError::ValidationError(String::from(
                "Only SELECT statements are supported",
            ))),
        }
    }

    /// Translates a sqlparser::ast::Query to a LogicalPlan.
    ///
    /// # Arguments
    ///
    /// * `sql` - AST to translate.
    /// * `catalog` - Catalog for validation.
    pub fn from_sql(
        sql: &sqlparser::ast::Query,
        catalog: &'a FileCatalog,
    ) -> Result<LogicalPlan, MiniRelError> {
        let mut translator = TranslateAndValidate::new(catalog);
        translator.process_query(sql)?;
        Ok(translator.plan)
    }

    /// Helper function to process sqlparser::ast::Query.
    fn process_query(&mut self, query: &sqlparser::ast::Query) -> Result<(), MiniRelError> {
        match &query.body {
            SetExpr::Select(b) => self.process_select(&*b),
            _ => Err(MiniRelError::ValidationError(String::from(
                "Only plain SELECT queries are supported",
            ))),
        }
    }

    /// Helper function to process sqlparser::ast::Select.
    fn process_select(&mut self, select: &sqlparser::ast::Select) -> Result<(), MiniRelError> {
        if select.distinct {
            return Err(MiniRelError::ValidationError(String::from(
                "Distinct not supported",
            )));
        }
        if select.having.is_some() {
            return Err(MiniRelError::ValidationError(String::from(
                "Having not supported",
            )));
        }
        if !select.group_by.is_empty() {
            return Err(MiniRelError::ValidationError(String::from(
                "Group by not supported",
            )));
        }

        // From: relations and inner joins; ON conjuncts are collected and
        // appended to the WHERE conjunction below
        let mut scans = Vec::new();
        let mut join_conds = Vec::new();
        for sel in &select.from {
            scans.push(self.process_table_factor(&sel.relation)?);
            for join in &sel.joins {
                let (right, pred) = self.process_join(join)?;
                scans.push(right);
                join_conds.push(pred);
            }
        }
        if scans.is_empty() {
            return Err(MiniRelError::ValidationError(String::from(
                "No tables listed in the query",
            )));
        }

        // fold relations into a left-deep cartesian chain
        let mut node = scans[0];
        for scan in &scans[1..] {
            let product = self.plan.add_node(LogicalOp::CartesianProduct);
            self.plan.add_edge(product, node);
            self.plan.add_edge(product, *scan);
            node = product;
        }

        // Where: AND-connected comparisons only
        let mut conds = Vec::new();
        if let Some(expr) = &select.selection {
            self.process_conjunction(expr, &mut conds)?;
        }
        conds.extend(join_conds);
        if !conds.is_empty() {
            let sel_node = self
                .plan
                .add_node(LogicalOp::Selection(SelectionNode { predicates: conds }));
            self.plan.add_edge(sel_node, node);
            node = sel_node;
        }

        // Select list; an empty projection field list represents '*'
        let mut fields = Vec::new();
        let mut wildcard = false;
        for item in &select.projection {
            match item {
                SelectItem::Wildcard => {
                    if select.projection.len() > 1 {
                        return Err(MiniRelError::ValidationError(String::from(
                            "Cannot select wildcard and exp in same select",
                        )));
                    }
                    wildcard = true;
                    break;
                }
                SelectItem::UnnamedExpr(expr) => fields.push(self.expr_to_ident(expr)?),
                _ => {
                    return Err(MiniRelError::ValidationError(String::from(
                        "Select unsupported expression",
                    )));
                }
            }
        }
        if wildcard {
            fields.clear();
        }
        let project = self
            .plan
            .add_node(LogicalOp::Projection(ProjectionNode { fields }));
        self.plan.add_edge(project, node);
        Ok(())
    }

    /// Creates a Relation node for a table factor, adds it to self.plan, and
    /// returns the OpIndex.
    ///
    /// # Arguments
    ///
    /// * `tf` - Table to process.
    fn process_table_factor(
        &mut self,
        tf: &sqlparser::ast::TableFactor,
    ) -> Result<OpIndex, MiniRelError> {
        match tf {
            TableFactor::Table { name, .. } => {
                let name = get_name(&name)?;
                if !self.catalog.is_valid_table(&name) {
                    return Err(MiniRelError::ValidationError(String::from(
                        "Invalid table name",
                    )));
                }
                self.tables.push(name.clone());
                let op = RelationNode { name };
                Ok(self.plan.add_node(LogicalOp::Relation(op)))
            }
            _ => Err(MiniRelError::ValidationError(String::from(
                "Nested joins and derived tables not supported",
            ))),
        }
    }

    /// Desugars `INNER JOIN <table> ON <pred>` into the joined relation's
    /// node plus the ON conjunct.
    ///
    /// # Arguments
    ///
    /// * `join` - The join node to parse.
    fn process_join(
        &mut self,
        join: &sqlparser::ast::Join,
    ) -> Result<(OpIndex, PredicateNode), MiniRelError> {
        let right = self.process_table_factor(&join.relation)?;
        let jc = match &join.join_operator {
            JoinOperator::Inner(jc) => jc,
            _ => {
                return Err(MiniRelError::ValidationError(String::from(
                    "Unsupported join type",
                )));
            }
        };
        if let JoinConstraint::On(expr) = jc {
            let pred = self.process_binary_op(expr)?;
            return Ok((right, pred));
        }
        Err(MiniRelError::ValidationError(String::from(
            "Unsupported join type",
        )))
    }

    /// Flattens an AND tree of comparisons into the conjunct list.
    fn process_conjunction(
        &self,
        expr: &Expr,
        out: &mut Vec<PredicateNode>,
    ) -> Result<(), MiniRelError> {
        match expr {
            Expr::BinaryOp {
                left,
                op: BinaryOperator::And,
                right,
            } => {
                self.process_conjunction(left, out)?;
                self.process_conjunction(right, out)
            }
            Expr::Nested(inner) => self.process_conjunction(inner, out),
            _ => {
                out.push(self.process_binary_op(expr)?);
                Ok(())
            }
        }
    }

    /// Parses an expression to a predicate node.
    ///
    /// # Arguments
    ///
    /// * `expr` - Expression to parse.
    fn process_binary_op(&self, expr: &Expr) -> Result<PredicateNode, MiniRelError> {
        match expr {
            Expr::BinaryOp { left, op, right } => Ok(PredicateNode::new(
                self.expr_to_pred_expr(left)?,
                Self::binary_operator_to_predicate(op)?,
                self.expr_to_pred_expr(right)?,
            )),
            _ => Err(MiniRelError::ValidationError(String::from(
                "Unsupported binary operation",
            ))),
        }
    }

    /// Parses the non-operator parts of the expression to predicate expressions.
    ///
    /// # Arguments
    ///
    /// * `expr` - Non-operator part of the expression to parse.
    fn expr_to_pred_expr(&self, expr: &Expr) -> Result<PredExpr, MiniRelError> {
        match expr {
            Expr::Value(val) => match val {
                Value::Number(s) => {
                    let i = s.parse::<i32>().map_err(|_| {
                        MiniRelError::ValidationError(format!("Unsupported literal {}", s))
                    })?;
                    let f = Field::IntField(i);
                    Ok(PredExpr::Literal(f))
                }
                Value::SingleQuotedString(s) => {
                    let f = Field::StringField(s.to_string());
                    Ok(PredExpr::Literal(f))
                }
                _ => Err(MiniRelError::ValidationError(String::from(
                    "Unsupported literal in predicate",
                ))),
            },
            _ => Ok(PredExpr::Ident(self.expr_to_ident(expr)?)),
        }
    }

    /// Parses binary operators to predicate operators.
    ///
    /// # Arguments
    ///
    /// * `op` - Binary operator to parse.
    fn binary_operator_to_predicate(op: &BinaryOperator) -> Result<PredicateOp, MiniRelError> {
        match op {
            BinaryOperator::Gt => Ok(PredicateOp::GreaterThan),
            BinaryOperator::Lt => Ok(PredicateOp::LessThan),
            BinaryOperator::GtEq => Ok(PredicateOp::GreaterThanOrEq),
            BinaryOperator::LtEq => Ok(PredicateOp::LessThanOrEq),
            BinaryOperator::Eq => Ok(PredicateOp::Equals),
            BinaryOperator::NotEq => Ok(PredicateOp::NotEq),
            _ => Err(MiniRelError::ValidationError(String::from(
                "Unsupported binary operation",
            ))),
        }
    }

    /// Converts a sqlparser::ast::Expr to a FieldIdentifier.
    ///
    /// # Arguments
    ///
    /// * `expr` - Expression to be converted.
    fn expr_to_ident(&self, expr: &Expr) -> Result<FieldIdentifier, MiniRelError> {
        match expr {
            Expr::Identifier(name) => self.disambiguate_name(vec![name]),
            Expr::CompoundIdentifier(names) => {
                self.disambiguate_name(names.iter().map(|s| s.as_ref()).collect())
            }
            _ => Err(MiniRelError::ValidationError(String::from(
                "Unsupported expression",
            ))),
        }
    }

    /// Validates a column reference against the tables listed in the query
    /// without rewriting it: an unqualified column stays unqualified.
    ///
    /// # Arguments
    ///
    /// * `identifiers` - Elements of a multi-part identifier, e.g.
    ///   table.column would be vec!["table", "column"].
    fn disambiguate_name(&self, identifiers: Vec<&str>) -> Result<FieldIdentifier, MiniRelError> {
        let orig = identifiers.join(".");
        if identifiers.len() > 2 {
            return Err(MiniRelError::ValidationError(format!(
                "No . table names supported in field {}",
                orig
            )));
        }
        if identifiers.len() == 2 {
            let (table, column) = (identifiers[0], identifiers[1]);
            if !self.tables.iter().any(|t| t == table) {
                return Err(MiniRelError::ValidationError(format!(
                    "The table {} is not listed in the query",
                    table
                )));
            }
            if self.catalog.is_valid_column(table, column) {
                return Ok(FieldIdentifier::new(table, column));
            }
            return Err(MiniRelError::ValidationError(format!(
                "The field {} is not present in tables listed in the query",
                orig
            )));
        }

        let mut found = false;
        for table in &self.tables {
            if self.catalog.is_valid_column(table, &orig) {
                if found {
                    return Err(MiniRelError::ValidationError(format!(
                        "The field {} could refer to more than one table listed in the query",
                        orig
                    )));
                }
                found = true;
            }
        }
        if found {
            Ok(FieldIdentifier::unqualified(&orig))
        } else {
            Err(MiniRelError::ValidationError(format!(
                "The field {} is not present in tables listed in the query",
                orig
            )))
        }
    }
}
