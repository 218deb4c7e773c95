use common::logical_plan::{FieldIdentifier, LogicalPlan};
use common::statistics::Statistics;
use common::{Field, QueryResult};
use filestore::testutil::setup_data_dir;
use filestore::FileCatalog;
use optimizer::{run_pass, OptimizerPass};
use queryexe::query::{Executor, TranslateAndValidate};

fn college_catalog() -> FileCatalog {
    let dir = setup_data_dir(
        &[
            "Students(sid:INT,name:STR,dept:STR)",
            "Depts(dept:STR,office:INT)",
            "Grades(sid:INT,course:STR,grade:INT)",
        ],
        &[
            ("Students", &["1#Ada#CS", "2#Grace#EE", "3#Alan#CS"]),
            ("Depts", &["CS#100", "EE#200"]),
            ("Grades", &["1#db#90", "2#db#85", "3#os#70", "1#os#95"]),
        ],
    );
    FileCatalog::load(&dir).unwrap()
}

fn run_plan(catalog: &FileCatalog, plan: &LogicalPlan) -> QueryResult {
    let op = Executor::logical_plan_to_op_iterator(catalog, plan).unwrap();
    let mut executor = Executor::new_ref();
    executor.configure_query(op);
    executor.execute().unwrap()
}

fn run_sql(
    catalog: &FileCatalog,
    stats: &Statistics,
    sql: &str,
    passes: &[OptimizerPass],
) -> QueryResult {
    let mut plan = TranslateAndValidate::from_sql_str(sql, catalog).unwrap();
    for pass in passes {
        plan = run_pass(pass, plan, stats).unwrap();
    }
    run_plan(catalog, &plan)
}

/// Rows as sorted strings, for order-insensitive tuple-set comparison.
fn sorted_rows(result: &QueryResult) -> Vec<String> {
    let mut rows: Vec<String> = result.tuples().iter().map(|t| t.to_string()).collect();
    rows.sort();
    rows
}

#[test]
fn test_pushdown_is_safe() {
    common::testutil::init();
    let catalog = college_catalog();
    let stats = catalog.compute_statistics().unwrap();
    let sql = "SELECT * FROM Students, Depts \
               WHERE Students.dept = Depts.dept AND office = 100";
    let naive = run_sql(&catalog, &stats, sql, &[]);
    let pushed = run_sql(&catalog, &stats, sql, &[OptimizerPass::PushSelectionsDown]);
    assert_eq!(sorted_rows(&naive), sorted_rows(&pushed));
    assert_eq!(naive.tuples().len(), 2);
}

#[test]
fn test_cartesian_to_join_is_equivalent() {
    common::testutil::init();
    let catalog = college_catalog();
    let stats = catalog.compute_statistics().unwrap();
    let sql = "SELECT * FROM Students, Depts WHERE Students.dept = Depts.dept";
    let naive = run_sql(&catalog, &stats, sql, &[]);
    let joined = run_sql(
        &catalog,
        &stats,
        sql,
        &[
            OptimizerPass::PushSelectionsDown,
            OptimizerPass::CartesianToJoin,
            OptimizerPass::GreedyJoinOrder,
        ],
    );
    assert_eq!(sorted_rows(&naive), sorted_rows(&joined));
    assert_eq!(naive.tuples().len(), 3);
}

#[test]
fn test_single_row_join_raw_and_converted() {
    common::testutil::init();
    let dir = setup_data_dir(
        &["Alpha(a1:INT,a2:STR)", "Beta(b1:INT)"],
        &[("Alpha", &["3#x"]), ("Beta", &["3"])],
    );
    let catalog = FileCatalog::load(&dir).unwrap();
    let stats = catalog.compute_statistics().unwrap();
    let sql = "SELECT * FROM Alpha, Beta WHERE a1 = b1";

    let raw = run_sql(&catalog, &stats, sql, &[]);
    assert_eq!(raw.tuples().len(), 1);
    let row = &raw.tuples()[0];
    assert_eq!(
        row.get(&FieldIdentifier::parse("Alpha.a1")),
        Some(&Field::IntField(3))
    );
    assert_eq!(
        row.get(&FieldIdentifier::parse("Alpha.a2")),
        Some(&Field::StringField(String::from("x")))
    );
    assert_eq!(
        row.get(&FieldIdentifier::parse("Beta.b1")),
        Some(&Field::IntField(3))
    );

    // converting the product into a join first returns the identical row
    let converted = run_sql(
        &catalog,
        &stats,
        sql,
        &[
            OptimizerPass::PushSelectionsDown,
            OptimizerPass::CartesianToJoin,
            OptimizerPass::GreedyJoinOrder,
        ],
    );
    assert_eq!(sorted_rows(&raw), sorted_rows(&converted));
}

#[test]
fn test_three_way_join_full_pipeline() {
    common::testutil::init();
    let catalog = college_catalog();
    let stats = catalog.compute_statistics().unwrap();
    let sql = "SELECT * FROM Students, Depts, Grades \
               WHERE Students.dept = Depts.dept AND Students.sid = Grades.sid";
    let naive = run_sql(&catalog, &stats, sql, &[]);
    assert_eq!(naive.tuples().len(), 4);

    for cost_pass in &[OptimizerPass::GreedyJoinOrder, OptimizerPass::ExhaustiveSearch] {
        let optimized = run_sql(
            &catalog,
            &stats,
            sql,
            &[
                OptimizerPass::PushSelectionsDown,
                OptimizerPass::CartesianToJoin,
                *cost_pass,
            ],
        );
        assert_eq!(sorted_rows(&naive), sorted_rows(&optimized));
    }
}

#[test]
fn test_projection_narrows_output() {
    common::testutil::init();
    let catalog = college_catalog();
    let stats = catalog.compute_statistics().unwrap();
    let result = run_sql(
        &catalog,
        &stats,
        "SELECT name FROM Students WHERE dept = 'CS'",
        &[],
    );
    let mut names: Vec<String> = result
        .tuples()
        .iter()
        .map(|t| t.values()[0].unwrap_string_field().to_string())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Ada", "Alan"]);
    for t in result.tuples() {
        assert_eq!(t.size(), 1);
    }
}

#[test]
fn test_cost_trace_is_preorder_and_counts_rows() {
    common::testutil::init();
    let catalog = college_catalog();
    let stats = catalog.compute_statistics().unwrap();
    let result = run_sql(
        &catalog,
        &stats,
        "SELECT name FROM Students WHERE dept = 'CS'",
        &[],
    );
    let trace: Vec<(String, u64)> = result.cardinalities().to_vec();
    assert_eq!(
        trace,
        vec![
            (String::from("Projection"), 2),
            (String::from("Selection"), 2),
            (String::from("RelationScan(Students)"), 3),
        ]
    );
}

#[test]
fn test_merge_selections_pass_preserves_results() {
    common::testutil::init();
    let catalog = college_catalog();
    let stats = catalog.compute_statistics().unwrap();
    // the two single-table conjuncts sink and stack above Students; the
    // merge pass then collapses the stack into one selection
    let sql = "SELECT * FROM Students, Depts \
               WHERE Students.dept = Depts.dept AND Students.name = 'Ada' \
               AND Students.dept = 'CS'";
    let naive = run_sql(&catalog, &stats, sql, &[]);
    let merged = run_sql(
        &catalog,
        &stats,
        sql,
        &[
            OptimizerPass::PushSelectionsDown,
            OptimizerPass::MergeSelections,
        ],
    );
    assert_eq!(sorted_rows(&naive), sorted_rows(&merged));
    assert_eq!(naive.tuples().len(), 1);
}

#[test]
fn test_missing_statistics_abort_before_execution() {
    common::testutil::init();
    let catalog = college_catalog();
    let empty = Statistics::new();
    let plan = TranslateAndValidate::from_sql_str(
        "SELECT * FROM Students, Depts WHERE Students.dept = Depts.dept",
        &catalog,
    )
    .unwrap();
    assert!(run_pass(&OptimizerPass::CartesianToJoin, plan, &empty).is_err());
}

#[test]
fn test_result_display_renders_header_and_rows() {
    common::testutil::init();
    let catalog = college_catalog();
    let stats = catalog.compute_statistics().unwrap();
    let result = run_sql(&catalog, &stats, "SELECT name FROM Students", &[]);
    let rendered = result.to_string();
    assert!(rendered.contains("Students.name"));
    assert!(rendered.contains("Grace"));
}
