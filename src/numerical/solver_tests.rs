use crate::config::SolverConfig;
use crate::errors::NexsysError;
use crate::numerical::NR::LinearSysMethod;
use crate::numerical::solver::Nexsys;
use approx::assert_relative_eq;
use std::collections::HashMap;

fn quiet() -> SolverConfig {
    SolverConfig::default().with_loglevel("off")
}

fn run(text: &str) -> (crate::Solution, crate::SolveReport) {
    Nexsys::new(text, &quiet()).unwrap().solve().unwrap()
}

#[test]
fn test_chain_then_block() {
    let (solution, report) = run("a = 4\nb = a + 5\nx + y = b\nx - y = a");
    assert_relative_eq!(solution["a"], 4.0, epsilon = 1e-10);
    assert_relative_eq!(solution["b"], 9.0, epsilon = 1e-10);
    assert_relative_eq!(solution["x"], 6.5, epsilon = 1e-9);
    assert_relative_eq!(solution["y"], 2.5, epsilon = 1e-9);
    assert!(report.is_complete());
    // two scalar solves and one 2x2 block
    assert_eq!(report.log.len(), 3);
    assert!(report.log[2].starts_with("solved system"));
}

#[test]
fn test_fractional_literals() {
    let (solution, _) = run("y = 2.5");
    assert_eq!(solution["y"], 2.5);

    let text = "guess 0.5 for v\nkeep v on [0.1, 10]\nv^2 = 0.25";
    let (solution, _) = run(text);
    assert_relative_eq!(solution["v"], 0.5, epsilon = 1e-10);

    // the fractional parts decide the answer; residuals near 3e8 round at ~1e-7
    let config = quiet().with_tolerance(1e-6);
    let (solution, report) = Nexsys::new("x + y = 3e8\nx - y = 1e8 + 0.1", &config)
        .unwrap()
        .solve()
        .unwrap();
    assert_relative_eq!(solution["x"], 200000000.05, epsilon = 1e-6);
    assert_relative_eq!(solution["y"], 99999999.95, epsilon = 1e-6);
    assert!(report.is_complete());
}

#[test]
fn test_linear_3x3_block() {
    let (solution, report) = run("x + y + z = 6\n2*x - y + z = 3\nx + 2*y - z = 2");
    assert_relative_eq!(solution["x"], 1.0, epsilon = 1e-9);
    assert_relative_eq!(solution["y"], 2.0, epsilon = 1e-9);
    assert_relative_eq!(solution["z"], 3.0, epsilon = 1e-9);
    assert_eq!(report.log.len(), 1);
}

#[test]
fn test_linear_3x3_block_with_inverse() {
    let config = quiet().with_linear_sys_method(LinearSysMethod::Inv);
    let (solution, _) = Nexsys::new("x + y + z = 6\n2*x - y + z = 3\nx + 2*y - z = 2", &config)
        .unwrap()
        .solve()
        .unwrap();
    assert_relative_eq!(solution["z"], 3.0, epsilon = 1e-9);
}

#[test]
fn test_nonlinear_2x2_block() {
    let text = "guess 4 for x\nguess 2.5 for y\nx^2 + y^2 = 25\nx*y = 12";
    let (solution, report) = run(text);
    assert_relative_eq!(solution["x"], 4.0, epsilon = 1e-8);
    assert_relative_eq!(solution["y"], 3.0, epsilon = 1e-8);
    assert!(report.iterations > 1);
}

#[test]
fn test_guesses_pick_the_root() {
    let mut solver = Nexsys::new("x^2 + y^2 = 25\nx*y = 12", &quiet()).unwrap();
    solver.mass_add_guess(HashMap::from([("x".to_string(), 3.2), ("y".to_string(), 3.9)]));
    let (solution, _) = solver.solve().unwrap();
    assert_relative_eq!(solution["x"], 3.0, epsilon = 1e-8);
    assert_relative_eq!(solution["y"], 4.0, epsilon = 1e-8);
}

#[test]
fn test_domain_keeps_root_in_range() {
    let (solution, report) = run("keep x on [-10, 0]\nx^2 = 1");
    assert_relative_eq!(solution["x"], -1.0, epsilon = 1e-8);
    assert!(report.is_complete());

    let mut solver = Nexsys::new("x^2 = 1", &quiet()).unwrap();
    solver.domain("x", [0.5, 10.0]).unwrap();
    let (solution, _) = solver.solve().unwrap();
    assert_relative_eq!(solution["x"], 1.0, epsilon = 1e-8);
}

#[test]
fn test_bad_domains() {
    let mut solver = Nexsys::new("x = 1", &quiet()).unwrap();
    assert!(matches!(solver.domain("x", [1.0, 1.0]), Err(NexsysError::Domain { .. })));
    assert!(
        solver
            .mass_add_domains(HashMap::from([("x".to_string(), [3.0, -3.0])]))
            .is_err()
    );
}

#[test]
fn test_nonconvergence() {
    let text = "guess 2 for x\nx^2 + 1 = 0";
    let strict = quiet().with_max_iterations(20);
    let err = Nexsys::new(text, &strict).unwrap().solve().unwrap_err();
    assert!(matches!(err, NexsysError::NonConvergence { ref vars, .. } if vars == &vec!["x".to_string()]));

    let lenient = strict.with_allow_nonconvergence(true);
    let (solution, report) = Nexsys::new(text, &lenient).unwrap().solve().unwrap();
    assert!(solution.contains("x"));
    assert_eq!(report.nonconverged, vec!["x".to_string()]);
    assert!(!report.is_complete());
}

#[test]
fn test_singular_block() {
    let err = Nexsys::new("x + y = 1\n2*x + 2*y = 3", &quiet())
        .unwrap()
        .solve()
        .unwrap_err();
    assert!(matches!(err, NexsysError::SingularJacobian { .. }));
}

#[test]
fn test_edits_make_knowns() {
    let mut solver = Nexsys::new("x + y = b\nx - y = a", &quiet()).unwrap();
    solver.edit("a", 4.0);
    solver.mass_add_edits(HashMap::from([("b".to_string(), 9.0)]));
    let (solution, _) = solver.solve().unwrap();
    assert_relative_eq!(solution["x"], 6.5, epsilon = 1e-9);
    assert_eq!(solution["a"], 4.0);
}

#[test]
fn test_unsolved_and_inconsistent() {
    let (solution, report) = run("x = 1\ny + z = x");
    assert_eq!(solution.len(), 1);
    assert_eq!(report.unsolved, vec!["[line 2] y + z = x".to_string()]);

    let (solution, report) = run("a = 2\nb = 3\na + b = 6");
    assert_relative_eq!(solution["b"], 3.0, epsilon = 1e-10);
    assert_eq!(report.inconsistent.len(), 1);
    assert!(report.inconsistent[0].starts_with("[line 3]"));
    assert!(report.unsolved.is_empty());
}

#[test]
fn test_conditional_equation() {
    let text = "x = 3\nif x > 2:\n    y = 2*x\nelse:\n    y = -x\nend";
    let (solution, _) = run(text);
    assert_relative_eq!(solution["y"], 6.0, epsilon = 1e-9);

    let (solution, _) = run("x = 1\ny = if(x > 2, 2*x, -x)");
    assert_relative_eq!(solution["y"], -1.0, epsilon = 1e-9);
}

#[test]
fn test_units_and_constants() {
    let text = "\"falling body\"\nd = 100 * [ft->m]\nt = 10 * [s->ms] / 1000\nv = d / t\nW = m * #g\nm = 2";
    let (solution, _) = run(text);
    assert_relative_eq!(solution["d"], 30.48, epsilon = 1e-9);
    assert_relative_eq!(solution["v"], 3.048, epsilon = 1e-9);
    assert_relative_eq!(solution["W"], 19.6133, epsilon = 1e-9);
}

#[test]
fn test_errors_surface_from_new() {
    assert!(matches!(Nexsys::new("x = ", &quiet()), Err(e) if e.is_parse_error()));
    assert!(matches!(
        Nexsys::new("x = #nope", &quiet()),
        Err(NexsysError::UnknownConstant(_))
    ));
    assert!(matches!(
        Nexsys::new("x = 1", &quiet().with_tolerance(0.0)),
        Err(NexsysError::Config(_))
    ));
}
