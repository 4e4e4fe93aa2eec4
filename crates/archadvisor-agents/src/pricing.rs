//! Per-model token pricing, USD per 1K tokens.

pub struct ModelPrice {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

const MODEL_COSTS: &[(&str, ModelPrice)] = &[
    (
        "gpt-4o",
        ModelPrice {
            input_per_1k: 0.0025,
            output_per_1k: 0.01,
        },
    ),
    (
        "gpt-4o-mini",
        ModelPrice {
            input_per_1k: 0.00015,
            output_per_1k: 0.0006,
        },
    ),
];

const DEFAULT_PRICE: ModelPrice = ModelPrice {
    input_per_1k: 0.003,
    output_per_1k: 0.015,
};

pub fn estimate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let price = MODEL_COSTS
        .iter()
        .find(|(id, _)| *id == model)
        .map(|(_, price)| price)
        .unwrap_or(&DEFAULT_PRICE);
    (input_tokens as f64 / 1000.0) * price.input_per_1k
        + (output_tokens as f64 / 1000.0) * price.output_per_1k
}
