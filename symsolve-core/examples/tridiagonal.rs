//! Walkthrough of the adapter phase protocol on a small indefinite system.
//!
//! Solves K x = b with
//!
//!   K = [ 2   1   0 ]
//!       [ 1  -1   0 ]
//!       [ 0   0   3 ]
//!
//! given as 4 lower-triangle triplets, then escalates the pivot tolerance
//! and shows the CallAgain handshake.
//!
//! Run with `RUST_LOG=symsolve::linear_algebra=debug` to see the journal.

use std::sync::Arc;

use symsolve_core::{
    init_logger, AdapterOptions, FaerLdlBackend, SymSolverStatus, SymmetricSolverAdapter,
};

fn main() {
    init_logger();

    let rows: Arc<[usize]> = Arc::from(vec![0, 1, 1, 2]);
    let cols: Arc<[usize]> = Arc::from(vec![0, 0, 1, 2]);
    let values = [2.0, 1.0, -1.0, 3.0];
    let b = vec![1.0, 1.0, 1.0];

    let mut solver = match SymmetricSolverAdapter::with_tracing(FaerLdlBackend::from_env()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Backend setup failed: {}", e);
            std::process::exit(1);
        }
    };

    let options = AdapterOptions {
        pivot_tolerance: 1e-6,
        pivot_tolerance_max: Some(0.1),
        ..AdapterOptions::from_env()
    };
    if let Err(e) = solver.configure(&options) {
        eprintln!("Invalid options: {}", e);
        std::process::exit(1);
    }

    let run = |solver: &mut SymmetricSolverAdapter<FaerLdlBackend>| -> Result<(), Box<dyn std::error::Error>> {
        let status = solver.initialize_structure(3, 4, rows.clone(), cols.clone())?;
        println!("Structure: n = {}, nnz = {}, analysis {}", solver.dimension(), solver.nonzeros(), status);

        solver.values_mut()?.copy_from_slice(&values);
        let mut x = b.clone();
        let status = solver.multi_solve(true, &rows, &cols, 1, &mut x, Some(1))?;
        println!("First solve: {}", status);
        println!("  x = {:?}", x);
        println!(
            "  negative eigenvalues: {:?}",
            solver.number_of_negative_eigenvalues()
        );

        let old_tol = solver.pivot_tolerance();
        if solver.increase_quality() {
            println!(
                "Pivot tolerance increased: {:.1e} -> {:.1e}",
                old_tol,
                solver.pivot_tolerance()
            );
        }

        let mut x = b.clone();
        let mut status = solver.multi_solve(false, &rows, &cols, 1, &mut x, Some(1))?;
        while status == SymSolverStatus::CallAgain {
            println!("Adapter asked for the values again");
            solver.values_mut()?.copy_from_slice(&values);
            status = solver.multi_solve(false, &rows, &cols, 1, &mut x, Some(1))?;
        }
        println!("Second solve: {}", status);
        println!("  x = {:?}", x);

        let stats = solver.stats();
        println!(
            "\nStats: {} analyses, {} factorizations, {} solves, {:.3e}s numeric",
            stats.num_symbolic, stats.num_numeric, stats.num_solves, stats.time_numeric
        );
        Ok(())
    };

    if let Err(e) = run(&mut solver) {
        eprintln!("Solver failed: {}", e);
        std::process::exit(1);
    }
}
