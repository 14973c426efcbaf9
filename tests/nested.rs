extern crate easy_rev;

#[cfg(test)]
mod nested_tests {
    use easy_rev::arena::ArenaConfig;
    use easy_rev::differentiation::{gradient, jacobian, Context, Var};
    use easy_rev::functions::softmax;
    use easy_rev::numeric::extra::{Cos, Exp, Sin};

    /// Builds a small graph on the context, returning its inputs and output.
    fn outer_graph(context: &Context) -> (Var<'_>, Var<'_>, Var<'_>) {
        let x = context.variable(0.7);
        let y = context.variable(-1.3);
        let z = ((x * y).sin() + (x / y).exp()) * y.cos();
        (x, y, z)
    }

    /// The values and adjoints of every node recorded so far, as bits.
    fn snapshot(context: &Context, vars: &[Var]) -> Vec<(u64, u64)> {
        vars.iter()
            .map(|var| (context.value(var).to_bits(), context.read_adjoint(var).to_bits()))
            .collect()
    }

    #[test]
    fn test_rollback_round_trip_is_bit_identical() {
        let context = Context::new();
        let (x, y, z) = outer_graph(&context);
        context.seed_adjoint(&z, 1.0);
        context.run_reverse_pass(None);
        let before = snapshot(&context, &[x, y, z]);
        let length = context.len();

        let checkpoint = context.checkpoint();
        {
            // an inner computation with its own sweep, on fresh leaves
            let a = context.variable(x.number);
            let b = (a * a * a).sin() - a;
            context.seed_adjoint(&b, 1.0);
            context.run_reverse_pass(Some(checkpoint));
            assert!(context.read_adjoint(&a) != 0.0);
        }
        context.rollback_to(checkpoint);

        assert_eq!(context.len(), length);
        assert_eq!(snapshot(&context, &[x, y, z]), before);

        // and the outer graph still sweeps to the same result
        let derivatives = z.derivatives();
        let context_again = Context::new();
        let (also_x, also_y, also_z) = outer_graph(&context_again);
        let also_derivatives = also_z.derivatives();
        assert_eq!(derivatives[&x].to_bits(), also_derivatives[&also_x].to_bits());
        assert_eq!(derivatives[&y].to_bits(), also_derivatives[&also_y].to_bits());
    }

    #[test]
    fn test_regions_roll_back_when_dropped() {
        let context = Context::new();
        let (x, y, z) = outer_graph(&context);
        let length = context.len();
        assert_eq!(context.depth(), 0);
        {
            let region = context.enter_region();
            assert_eq!(region.depth(), 1);
            assert_eq!(region.entry().len(), length);
            let inner = context.variable(z.number);
            let _ = inner * inner * inner;
            assert_eq!(context.len(), length + 3);
        }
        assert_eq!(context.depth(), 0);
        assert_eq!(context.len(), length);
        assert!(context.is_live(&x) && context.is_live(&y) && context.is_live(&z));
        assert!(context.check_topological_order());
    }

    #[test]
    fn test_regions_nest() {
        let context = Context::new();
        let x = context.variable(2.0);
        let outer_length = context.len();
        let result = context.nested(|outer| {
            let a = context.variable(x.number);
            let b = a * 3.0;
            let inner_length = context.len();
            let inner_result = context.nested(|inner| {
                assert_eq!(inner.depth(), 2);
                let c = context.variable(b.number);
                let d = c * c;
                context.seed_adjoint(&d, 1.0);
                inner.run_reverse_pass();
                // only the inner region was swept, so b is untouched
                assert_eq!(context.read_adjoint(&b), 0.0);
                context.read_adjoint(&c)
            });
            // the inner exit only rolls back to its own entry
            assert_eq!(context.len(), inner_length);
            assert!(context.is_live(&b));
            context.seed_adjoint(&b, inner_result);
            outer.run_reverse_pass();
            context.read_adjoint(&a)
        });
        assert_eq!(context.len(), outer_length);
        // d(3a)^2 / da = 18a
        assert_eq!(result, 36.0);
        assert_eq!(context.read_adjoint(&x), 0.0);
    }

    #[test]
    fn test_rolled_back_memory_is_reused() {
        let context = Context::with_config(ArenaConfig {
            initial_chunk_capacity: 4,
            growth_factor: 2,
        });
        let x = context.variable(1.0);
        let checkpoint = context.checkpoint();
        for _ in 0..3 {
            let mut total = x;
            for _ in 0..100 {
                total = total + x;
            }
            assert_eq!(total.number, 101.0);
            assert_eq!(total.derivatives()[&x], 101.0);
            context.rollback_to(checkpoint);
            assert_eq!(context.len(), 1);
        }
    }

    #[test]
    fn test_callbacks_are_dropped_on_rollback() {
        let context = Context::new();
        let x = context.variable(1.0);
        let y = x * 2.0;
        context.nested(|_| {
            let inputs = [context.variable(0.5), context.variable(1.5)];
            let outputs = softmax(&inputs).unwrap();
            assert_eq!(outputs.len(), 2);
        });
        // a callback recorded afterwards gets a fresh slot, not the rolled back one
        let id = x.id().unwrap();
        let z = context.make_callback_node(y.number * 3.0, move |adjoint, adjoints| {
            adjoints.accumulate(id, adjoint * 6.0);
        });
        assert_eq!(z.derivatives()[&x], 6.0);
    }

    #[test]
    fn test_gradient_and_jacobian_leave_the_context_unchanged() {
        let context = Context::new();
        let (x, _, z) = outer_graph(&context);
        let length = context.len();
        let (value, gradient) = gradient(&context, |inputs| inputs[0] * inputs[1].sin(), &[2.0, 0.5]);
        assert_eq!(value, 2.0 * 0.5_f64.sin());
        assert_eq!(gradient, vec![0.5_f64.sin(), 2.0 * 0.5_f64.cos()]);
        let (values, rows) = jacobian(&context, |inputs| vec![inputs[0] * inputs[1], inputs[0] - inputs[1]], &[3.0, 4.0]);
        assert_eq!(values, vec![12.0, -1.0]);
        assert_eq!(rows, vec![vec![4.0, 3.0], vec![1.0, -1.0]]);
        assert_eq!(context.len(), length);
        assert!(context.is_live(&x) && context.is_live(&z));
    }

    #[test]
    #[should_panic(expected = "has already been rolled back past")]
    fn test_stale_checkpoint() {
        let context = Context::new();
        let _x = context.variable(1.0);
        let start = context.checkpoint();
        let _y = context.variable(2.0);
        let later = context.checkpoint();
        context.rollback_to(start);
        // a node is recorded at the same position as before
        let _z = context.variable(3.0);
        context.rollback_to(later);
    }

    #[test]
    #[should_panic(expected = "past the entry of an open nested region")]
    fn test_rolling_back_past_an_open_region() {
        let context = Context::new();
        let start = context.checkpoint();
        let _x = context.variable(1.0);
        let _region = context.enter_region();
        context.rollback_to(start);
    }

    #[test]
    #[should_panic(expected = "inner regions must be exited first")]
    fn test_exiting_regions_out_of_order() {
        let context = Context::new();
        let outer = context.enter_region();
        let _inner = context.enter_region();
        outer.exit();
    }

    #[test]
    #[should_panic(expected = "cannot be reset while")]
    fn test_reset_inside_a_region() {
        let context = Context::new();
        let _region = context.enter_region();
        context.reset();
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "has since been rolled back")]
    fn test_using_a_handle_after_its_region() {
        let context = Context::new();
        let x = context.variable(1.0);
        let escaped = context.nested(|_| context.variable(2.0) * x);
        // a new node now occupies the position the escaped handle refers to
        let _y = context.variable(5.0);
        let _ = escaped + x;
    }
}
