extern crate easy_rev;

#[cfg(test)]
mod dogleg_tests {
    use approx::assert_abs_diff_eq;
    use easy_rev::differentiation::{Context, Var};
    use easy_rev::errors::SolverError;
    use easy_rev::solver::{algebra_solver, SolverConfig};
    use easy_rev::numeric::extra::Ln;

    fn shifted<'a>(x: &[Var<'a>], _: &[Var<'a>]) -> Vec<Var<'a>> {
        vec![x[0] - 36.0, x[1] - 6.0]
    }

    #[test]
    fn test_linear_system() {
        let context = Context::new();
        let theta = algebra_solver(&context, shifted, &[32.0, 5.0], &[], &SolverConfig::default()).unwrap();
        assert_eq!(theta[0].number, 36.0);
        assert_eq!(theta[1].number, 6.0);
        // nothing to differentiate with respect to, so nothing is recorded
        assert!(theta.iter().all(|x| x.is_constant()));
        assert_eq!(context.len(), 0);
    }

    #[test]
    fn test_linear_system_with_a_scaled_unknown() {
        let context = Context::new();
        let theta = algebra_solver(
            &context,
            |x, _| vec![x[0] - 36.0, x[1] - 6.0, x[2] * 42.0],
            &[32.0, 5.0, 10.0],
            &[],
            &SolverConfig::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(theta[0].number, 36.0, epsilon = 1e-12);
        assert_abs_diff_eq!(theta[1].number, 6.0, epsilon = 1e-12);
        // the solution found is not exactly 0
        assert_abs_diff_eq!(theta[2].number, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_derivatives_of_the_solution() {
        let context = Context::new();
        let y = [context.variable(4.0), context.variable(3.0)];
        // x0 = sqrt(y0), x1 = x0 y1
        let x = algebra_solver(
            &context,
            |x, y| vec![(x[0] * x[0]) - y[0], x[1] - (x[0] * y[1])],
            &[1.5, 1.0],
            &y,
            &SolverConfig::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(x[0].number, 2.0, epsilon = 1e-9);
        assert_abs_diff_eq!(x[1].number, 6.0, epsilon = 1e-9);
        // two solution nodes on top of the two parameters
        assert_eq!(context.len(), 4);

        let derivatives = x[0].derivatives();
        assert_abs_diff_eq!(derivatives[&y[0]], 0.25, epsilon = 1e-8);
        assert_abs_diff_eq!(derivatives[&y[1]], 0.0, epsilon = 1e-12);

        let derivatives = x[1].derivatives();
        // δ(sqrt(y0) y1) / δy0 = y1 / 2sqrt(y0)
        assert_abs_diff_eq!(derivatives[&y[0]], 0.75, epsilon = 1e-8);
        assert_abs_diff_eq!(derivatives[&y[1]], 2.0, epsilon = 1e-8);
    }

    #[test]
    fn test_solution_in_a_larger_graph() {
        let context = Context::new();
        let a = context.variable(2.0);
        let y = a * a;
        let x = algebra_solver(
            &context,
            |x, y| vec![(x[0] * x[0] * x[0]) - y[0]],
            &[1.0],
            &[y],
            &SolverConfig::default(),
        )
        .unwrap();
        let z = x[0] * a;
        // z = a^(2/3) a = a^(5/3)
        let expected = (5.0 / 3.0) * 2.0_f64.powf(2.0 / 3.0);
        assert_abs_diff_eq!(z.derivatives()[&a], expected, epsilon = 1e-8);
    }

    #[test]
    fn test_constant_parameters() {
        let context = Context::new();
        let x = context.variable(1.0);
        let before = context.len();
        let solution = algebra_solver(
            &context,
            |x, y| vec![(x[0] * x[0]) - y[0]],
            &[1.0],
            &[Var::constant(16.0)],
            &SolverConfig::default(),
        )
        .unwrap();
        assert_abs_diff_eq!(solution[0].number, 4.0, epsilon = 1e-9);
        assert!(solution[0].is_constant());
        assert_eq!(context.len(), before);
        assert!(context.is_live(&x));
    }

    #[test]
    fn test_no_root() {
        let context = Context::new();
        let result = algebra_solver(
            &context,
            |x, _| vec![(x[0] * x[0]) + 1.0],
            &[1.0],
            &[],
            &SolverConfig::default(),
        );
        assert!(matches!(result, Err(SolverError::Stalled { .. })));
        assert_eq!(context.len(), 0);
    }

    #[test]
    fn test_max_steps() {
        let context = Context::new();
        let config = SolverConfig {
            max_steps: 1,
            ..SolverConfig::default()
        };
        let result = algebra_solver(&context, shifted, &[32.0, 5.0], &[], &config);
        match result {
            Err(SolverError::MaxStepsExceeded { steps, residual }) => {
                assert_eq!(steps, 1);
                assert!(residual > 0.0);
            }
            other => panic!("Expected the solver to run out of steps, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_number_of_outputs() {
        let context = Context::new();
        let result = algebra_solver(
            &context,
            |x, _| vec![x[0] + x[1]],
            &[1.0, 2.0],
            &[],
            &SolverConfig::default(),
        );
        assert_eq!(
            result.unwrap_err(),
            SolverError::DimensionMismatch {
                argument: "System output",
                expected: 2,
                actual: 1,
            }
        );
    }

    #[test]
    fn test_invalid_arguments() {
        let context = Context::new();
        let y = context.variable(f64::NAN);
        let error = algebra_solver(&context, |x, _| vec![x[0]], &[1.0], &[y], &SolverConfig::default())
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "algebra_solver: parameter vector is NaN, but must be finite"
        );
        let error = algebra_solver(&context, |x, _| vec![x[0]], &[], &[], &SolverConfig::default())
            .unwrap_err();
        assert!(matches!(error, SolverError::Domain(_)));
        let error = algebra_solver(
            &context,
            |x, _| vec![x[0].ln()],
            &[-1.0],
            &[],
            &SolverConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(error, SolverError::NonFinite { index: 0, .. }));
    }

    #[test]
    fn test_singular_jacobian_at_the_solution() {
        let context = Context::new();
        let y = context.variable(0.0);
        // x^2 = y has a double root at 0 where the derivative with respect to x vanishes
        let result = algebra_solver(
            &context,
            |x, y| vec![(x[0] * x[0]) - y[0]],
            &[0.0],
            &[y],
            &SolverConfig::default(),
        );
        assert_eq!(result.unwrap_err(), SolverError::Singular);
    }

    #[test]
    #[should_panic(expected = "Vars must be using the same Context")]
    fn test_parameters_from_another_context() {
        let context = Context::new();
        let other = Context::new();
        let y = other.variable(1.0);
        let _ = algebra_solver(&context, |x, y| vec![x[0] - y[0]], &[0.0], &[y], &SolverConfig::default());
    }
}
