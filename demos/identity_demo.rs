//! Trains a tiny identity map (`output == input`) by demonstration, the
//! same scenario exercised in `tests/end_to_end.rs`, and prints the
//! learned curve. Run with `cargo run --bin identity_demo`.

use interactive_mlp::{Activation, Iml, ImlConfig, Loss, Mode, WeightInit};

fn main() {
    #[cfg(feature = "logging")]
    tracing_subscriber::fmt::init();

    let config = ImlConfig {
        n_inputs: 1,
        n_outputs: 1,
        hidden_layers: vec![8, 8],
        activations: vec![Activation::Tanh, Activation::Tanh, Activation::Linear],
        loss: Loss::Mse,
        weight_init: WeightInit::Random,
        learning_rate: 1.0,
        max_iter: 3000,
        convergence_threshold: 1e-5,
        seed: Some(42),
        ..ImlConfig::default()
    };

    let mut iml = Iml::new(config).expect("valid configuration");
    iml.set_logger(|msg| println!("[iml] {msg}"));

    for &x in &[0.1, 0.3, 0.5, 0.7, 0.9] {
        iml.set_input(0, x);
        iml.save_example().unwrap(); // A -> B, suppresses inference
        iml.set_output(0, x);
        iml.save_example().unwrap(); // B -> A, commits (x, x) and re-infers
    }

    iml.set_mode(Mode::Inference).unwrap();

    println!("x      -> learned f(x)");
    for i in 0..=10 {
        let x = i as f64 / 10.0;
        iml.set_input(0, x);
        iml.process().unwrap();
        println!("{x:.2}   -> {:.4}", iml.get_outputs()[0]);
    }
}
