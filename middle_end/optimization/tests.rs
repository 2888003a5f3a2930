use pretty_assertions::assert_eq;

use crate::{commons::Valid, front_end::ast::Program};

mod local_copy_prop;

// Read given test file, run given pass, and compare its result to the
// expected program from the result file.
fn run_test<E: std::fmt::Debug>(
    test_name: &str,
    pass: impl Fn(Valid<Program>) -> Result<Valid<Program>, E>,
    pass_name: &str,
) {
    let read = |input_file: &str| {
        String::from_utf8(
            std::fs::read(input_file)
                .unwrap_or_else(|_| panic!("Could not read the input file {}", input_file)),
        )
        .expect("The input file does not contain valid utf-8 text")
    };

    let input_program = read(&format!("test-data/{test_name}.p4"))
        .parse::<Program>()
        .unwrap()
        .validate()
        .unwrap();

    let actual = pass(input_program).unwrap().0.to_string();

    let expected = canonical(&read(&format!("test-data/{test_name}.{pass_name}.p4")));

    assert_eq!(actual, expected);
}

// the printed form of `code`, which must be a valid program.
fn canonical(code: &str) -> String {
    code.parse::<Program>()
        .unwrap()
        .validate()
        .unwrap()
        .0
        .to_string()
}
