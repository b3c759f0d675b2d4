//! JUnit-style XML report: one `<testsuite>` per module, nested `<testsuite>` per
//! category, one `<testcase>` per test.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use tracing::info;

use crate::error::{Result, UntestedError};
use crate::models::{NodeStats, Outcome, ResultNode, ResultTree, TestResult};

pub fn render(results: &[TestResult]) -> String {
    let tree = ResultTree::from_results(results);
    let total = tree.total();

    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        xml,
        "<testsuites tests=\"{}\" failures=\"{}\" skipped=\"{}\" time=\"{}\">",
        total.tests,
        total.failed,
        total.skipped,
        secs(total.duration)
    );

    for &module_id in tree.roots() {
        let Some(module) = tree.get(module_id) else {
            continue;
        };
        open_suite(&mut xml, 1, module);
        for category in tree.children(module_id) {
            open_suite(&mut xml, 2, category);
            for test in tree.children(category.id) {
                if let Some(result) = &test.result {
                    write_case(&mut xml, result);
                }
            }
            xml.push_str("\t\t</testsuite>\n");
        }
        xml.push_str("\t</testsuite>\n");
    }

    xml.push_str("</testsuites>\n");
    xml
}

/// Render and write to `path`, creating parent directories.
pub fn write(path: &Path, results: &[TestResult]) -> Result<()> {
    let report_err = |source| UntestedError::Report {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(report_err)?;
    }
    std::fs::write(path, render(results)).map_err(report_err)?;
    info!(path = %path.display(), tests = results.len(), "wrote report");
    Ok(())
}

fn open_suite(xml: &mut String, depth: usize, node: &ResultNode) {
    let NodeStats {
        tests,
        failed,
        skipped,
        duration,
    } = node.stats;
    let _ = writeln!(
        xml,
        "{}<testsuite name=\"{}\" tests=\"{tests}\" failures=\"{failed}\" skipped=\"{skipped}\" time=\"{}\">",
        "\t".repeat(depth),
        escape(&node.name),
        secs(duration)
    );
}

fn write_case(xml: &mut String, result: &TestResult) {
    let _ = writeln!(
        xml,
        "\t\t\t<testcase name=\"{}\" classname=\"{}\" time=\"{}\">",
        escape(&result.name.test),
        escape(&result.name.full()),
        secs(result.duration)
    );
    match result.outcome {
        Outcome::Skipped => xml.push_str("\t\t\t\t<skipped/>\n"),
        Outcome::Fail if result.errors.is_empty() => {
            xml.push_str("\t\t\t\t<failure>Failed for unknown reasons</failure>\n")
        }
        Outcome::Fail => {
            for error in &result.errors {
                let _ = writeln!(xml, "\t\t\t\t<failure>{}</failure>", escape(error));
            }
        }
        Outcome::Success => {}
    }
    xml.push_str("\t\t\t</testcase>\n");
}

fn secs(d: Duration) -> String {
    format!("{:.2}", d.as_secs_f64())
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
