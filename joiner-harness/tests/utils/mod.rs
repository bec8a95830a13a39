use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use joiner::catalog::Relation;
use joiner::config::ExecutionConfig;
use joiner::context::ExecutionContext;
use joiner_harness::loader::store_relation;
use joiner_harness::protocol::{run_protocol, END_OF_RELATIONS};

#[derive(Debug, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    /// Row-major tuples of every relation, in load order.
    pub relations: Vec<Vec<Vec<u64>>>,
    /// Query lines and batch markers fed after the relations.
    pub input: String,
    pub expected_output: String,
}

pub struct TestCaseRunner {
    pub paths: Vec<PathBuf>,
    pub configs: HashMap<&'static str, ExecutionConfig>,
}

impl TestCaseRunner {
    pub fn run(self) {
        for path in &self.paths {
            let test_cases = TestCaseRunner::load_test_cases(path).unwrap();
            for test_case in test_cases {
                self.run_case(path, &test_case);
            }
        }
    }

    fn load_test_cases(path: &Path) -> anyhow::Result<Vec<TestCase>> {
        let file = File::options()
            .read(true)
            .open(path)
            .with_context(|| format!("Failed to open test case file: {:?}", path))?;

        serde_yaml::from_reader(file)
            .with_context(|| format!("Failed to parse test case file: {:?}", path))
    }

    fn run_case(&self, path: &Path, test_case: &TestCase) {
        let relations = test_case
            .relations
            .iter()
            .map(|rows| Relation::from_rows(rows, 20).unwrap())
            .collect::<Vec<_>>();

        for (config_name, config) in &self.configs {
            let output = run_with_relations(&relations, &test_case.input, config.clone());
            assert_eq!(
                test_case.expected_output, output,
                "Output of test case {} in {:?} with config {} is different.",
                test_case.name, path, config_name
            );
        }
    }
}

/// Stores `relations` in a temporary directory and runs the whole protocol over them.
pub fn run_with_relations(relations: &[Relation], queries: &str, config: ExecutionConfig) -> String {
    let dir = tempfile::tempdir().unwrap();
    let mut input = String::new();
    for (relation_id, relation) in relations.iter().enumerate() {
        let path = dir.path().join(format!("r{}", relation_id));
        store_relation(relation, &path).unwrap();
        input.push_str(&format!("{}\n", path.display()));
    }
    input.push_str(END_OF_RELATIONS);
    input.push('\n');
    input.push_str(queries);

    let mut output = vec![];
    let context = ExecutionContext::with_catalog(Default::default());
    run_protocol(
        Cursor::new(input),
        &mut output,
        ExecutionContext { config, ..context },
    )
    .unwrap();
    String::from_utf8(output).unwrap()
}
