//! End-to-end scenarios: parse a POU source, derive the report, and
//! publish it into a description file next to human-authored notes.

use std::fs;
use std::path::PathBuf;

use pou_core::{
    change_pou_description, get_pou_description, parse_pou_file, report_as_text, REPORT_MARKER,
};

const COLLATZ_ODD: &str = "\
PROGRAM Collatz_Calculator_Odd
VAR_INPUT
    N : UINT := 1; (* Collatz Input *)
END_VAR
VAR_OUTPUT
    Result_Odd : UINT; (* Result if the input is an odd number *)
END_VAR
GROUPS
    GROUP Inputs : N;
    GROUP Outputs : Result_Odd;
END_GROUPS
BODY
    BLOCK Mul_1 : MUL AT (40, 10) PINS (IN1 IN, IN2 IN, OUT OUT);
    BLOCK Add_1 : ADD AT (90, 10) PINS (IN1 IN, IN2 IN, OUT OUT);
    WIRE N -> Mul_1.IN1;
    WIRE Mul_1.OUT -> Add_1.IN1;
    WIRE Add_1.OUT -> Result_Odd;
END_BODY
END_PROGRAM
";

const MULTI_ANDER: &str = "\
PROGRAM MultiANDer
VAR_INPUT
    IsOn_ST : SAFEBOOL; (* If system is on *)
    IsReady_ST : SAFEBOOL; (* If system is ready *)
    IsArmed_ST : SAFEBOOL; (* If system is armed *)
END_VAR
VAR_OUTPUT
    CanDoWork_ST : SAFEBOOL; (* If System can do work *)
END_VAR
BODY
    BLOCK And_1 : AND AT (50, 10) PINS (IN1 IN, IN2 IN, IN3 IN, OUT OUT);
    WIRE IsOn_ST -> And_1.IN1;
    WIRE IsReady_ST -> And_1.IN2;
    WIRE IsArmed_ST -> And_1.IN3;
    WIRE And_1.OUT -> CanDoWork_ST;
END_BODY
END_PROGRAM
";

const TRANSLATION_FILE: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<Translation Language=\"SF\">\n\
  <Description>Calculates one odd Collatz step.</Description>\n\
</Translation>\n";

struct TempTree {
    root: PathBuf,
}

impl TempTree {
    fn new() -> Self {
        let root = std::env::temp_dir().join(format!("pou-acceptance-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&root).unwrap();
        Self { root }
    }

    fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }
}

impl Drop for TempTree {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

#[test]
fn report_text_includes_variable_numeric_metrics() {
    let tree = TempTree::new();
    let odd = tree.write("Collatz_Calculator_Odd.pou", COLLATZ_ODD);
    let multi = tree.write("MultiANDer.pou", MULTI_ANDER);

    let report_1 = report_as_text(&parse_pou_file(&odd).unwrap());
    assert!(report_1.contains("Metrics"));
    assert!(report_1.contains("Num_Inputs: 1"));
    assert!(report_1.contains("Num_Outputs: 1"));

    let report_2 = report_as_text(&parse_pou_file(&multi).unwrap());
    assert!(report_2.contains("Num_Inputs: 3"));
    assert!(report_2.contains("Num_Outputs: 1"));
}

#[test]
fn report_text_includes_variable_names_and_comments() {
    let tree = TempTree::new();
    let odd = tree.write("Collatz_Calculator_Odd.pou", COLLATZ_ODD);
    let multi = tree.write("MultiANDer.pou", MULTI_ANDER);

    let report_1 = report_as_text(&parse_pou_file(&odd).unwrap());
    let report_2 = report_as_text(&parse_pou_file(&multi).unwrap());
    assert!(report_1.contains("Variables"));
    assert!(report_2.contains("Variables"));

    assert!(report_1.contains("(N, InputVar, UINT, 1, Collatz Input)"));
    assert!(report_2.contains("(IsOn_ST, InputVar, SAFEBOOL, UNINIT, If system is on)"));

    assert!(report_1
        .contains("(Result_Odd, OutputVar, UINT, UNINIT, Result if the input is an odd number)"));
    assert!(report_2.contains("(CanDoWork_ST, OutputVar, SAFEBOOL, UNINIT, If System can do work)"));
}

#[test]
fn all_variables_listed_once_each() {
    let tree = TempTree::new();
    let multi = tree.write("MultiANDer.pou", MULTI_ANDER);
    let report = report_as_text(&parse_pou_file(&multi).unwrap());

    for name in ["IsOn_ST", "IsReady_ST", "IsArmed_ST", "CanDoWork_ST"] {
        let occurrences = report.matches(&format!("({name},")).count();
        assert_eq!(occurrences, 1, "{name} should appear exactly once");
    }
}

#[test]
fn report_is_byte_identical_across_calls() {
    let tree = TempTree::new();
    let odd = tree.write("Collatz_Calculator_Odd.pou", COLLATZ_ODD);
    let program = parse_pou_file(&odd).unwrap();
    assert_eq!(report_as_text(&program), report_as_text(&program));
}

#[test]
fn can_output_to_description_file_then_restore() {
    let tree = TempTree::new();
    let odd = tree.write("Collatz_Calculator_Odd.pou", COLLATZ_ODD);
    let description_file = tree.write(
        "Collatz_Calculator_Odd/DESCRIPTIONTranslation_SF.xml",
        TRANSLATION_FILE,
    );

    let report = report_as_text(&parse_pou_file(&odd).unwrap());
    let original = get_pou_description(&description_file).unwrap();

    // Append report below the marker; notes above it survive.
    let combined = format!("{original}\n{REPORT_MARKER}\n{report}");
    change_pou_description(&combined, &description_file).unwrap();

    let updated = get_pou_description(&description_file).unwrap();
    assert_eq!(updated, combined);
    assert!(updated.contains("Metrics"));
    assert!(updated.contains("Variables"));
    assert!(updated.starts_with("Calculates one odd Collatz step."));

    // Restore and verify the round trip back.
    change_pou_description(&original, &description_file).unwrap();
    assert_eq!(get_pou_description(&description_file).unwrap(), original);
}
