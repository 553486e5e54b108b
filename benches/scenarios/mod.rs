//! Scenario benchmarks: the renderer driven the way the front end drives it.

mod renderer;

pub use renderer::bench_renderer;
