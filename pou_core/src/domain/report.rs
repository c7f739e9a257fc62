//! Deterministic text report over a parsed program: per-kind counts
//! followed by every variable in declaration order.

use crate::domain::ast::{Program, VarKind};

/// Render the analysis report. Pure function of the program: identical
/// input always yields a byte-identical string.
pub fn report_as_text(program: &Program) -> String {
    let mut out = String::new();

    out.push_str("Metrics:\n");
    for kind in VarKind::ALL {
        let count = program.count_of_kind(kind);
        if count == 0 {
            continue;
        }
        out.push_str(&format!("Num_{}: {}\n", kind.metric_label(), count));
    }

    out.push_str("\nVariables:\n");
    for var in &program.variables {
        out.push_str(&format!(
            "({}, {}, {}, {}, {})\n",
            var.name,
            var.kind.label(),
            var.data_type,
            var.init_or_uninit(),
            var.comment
        ));
    }

    out
}
