use console::Style;
use std::path::Path;

use crate::mutants::MutationCandidate;
use crate::report::{AggregateReport, MutantDetail};

pub fn print_error(msg: &str) {
    let style = Style::new().red().bold();
    eprintln!("{} {}", style.apply_to("✗"), msg);
}

pub fn print_success(msg: &str) {
    let style = Style::new().green().bold();
    println!("{} {}", style.apply_to("✓"), msg);
}

pub fn print_report(report: &AggregateReport, file: &Path) {
    let seconds = report.duration_ms as f64 / 1000.0;

    if report.surviving_mutants == 0 && report.total_mutants > 0 {
        let style = Style::new().green().bold();
        println!(
            "{} {}: {} mutants, all killed ({:.1}%) in {:.1}s",
            style.apply_to("✓"),
            file.display(),
            report.total_mutants,
            report.detection_rate,
            seconds,
        );
    } else {
        let style = Style::new().yellow().bold();
        println!(
            "{} {}: {} survived / {} mutants ({:.1}% detected) in {:.1}s",
            style.apply_to("!"),
            file.display(),
            report.surviving_mutants,
            report.total_mutants,
            report.detection_rate,
            seconds,
        );
    }

    let dim = Style::new().dim();
    println!(
        "  {} {} of {} tests pass the baseline",
        dim.apply_to("·"),
        report.tests_passing_baseline,
        report.tests.len(),
    );
    let timeouts = report.mutants.iter().filter(|m| !m.timed_out_by.is_empty()).count();
    if timeouts > 0 {
        println!("  {} {} mutants killed by timeout", dim.apply_to("·"), timeouts);
    }
    let errors: usize = report.mutants.iter().map(|m| m.execution_errors).sum();
    if errors > 0 {
        println!("  {} {} test executions failed to run", dim.apply_to("·"), errors);
    }

    if report.surviving_mutants > 0 {
        println!();
        for m in report.survivors() {
            print_survivor(m);
        }
    }

    println!();
    for t in &report.tests {
        let marker = if t.passes_baseline {
            Style::new().green().apply_to("✓")
        } else {
            Style::new().red().apply_to("✗")
        };
        println!(
            "  {} {} {} {}",
            marker,
            Style::new().cyan().bold().apply_to(&t.id),
            t.name,
            dim.apply_to(format!("({} detected)", t.detection_count)),
        );
    }
}

fn print_survivor(m: &MutantDetail) {
    let ref_style = Style::new().cyan().bold();
    let loc_style = Style::new().dim();
    let op_style = Style::new().magenta();

    println!(
        "  {} line {} {} {} → {}",
        ref_style.apply_to(format!("@{}", m.id)),
        m.line,
        loc_style.apply_to(format!("[{}]", m.description)),
        op_style.apply_to(m.original.trim()),
        op_style.apply_to(m.mutated.trim()),
    );
}

pub fn print_candidates(candidates: &[MutationCandidate], diffs: &[String]) {
    let ref_style = Style::new().cyan().bold();
    let dim = Style::new().dim();

    for (c, diff) in candidates.iter().zip(diffs) {
        println!(
            "{} line {} {}",
            ref_style.apply_to(format!("@{}", c.id)),
            c.line,
            dim.apply_to(format!("[{}]", c.description)),
        );
        // Show the diff lines
        for line in diff.lines() {
            if line.starts_with('-') {
                println!("  {}", Style::new().red().apply_to(line));
            } else if line.starts_with('+') {
                println!("  {}", Style::new().green().apply_to(line));
            }
        }
    }
}
