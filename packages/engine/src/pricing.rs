//! Static price table for the Cost Meter (C10), keyed by `(provider,
//! model)`. An unknown model prices at zero; that is not a failure.

/// Price per 1,000 tokens, in USD.
struct Price {
    provider: &'static str,
    model: &'static str,
    input_per_1k: f64,
    output_per_1k: f64,
}

const TABLE: &[Price] = &[
    Price { provider: "openai", model: "gpt-4o-mini", input_per_1k: 0.00015, output_per_1k: 0.0006 },
    Price { provider: "openai", model: "gpt-4o", input_per_1k: 0.0025, output_per_1k: 0.01 },
    Price { provider: "anthropic", model: "claude-3-5-haiku-20241022", input_per_1k: 0.0008, output_per_1k: 0.004 },
    Price { provider: "anthropic", model: "claude-3-5-sonnet-20241022", input_per_1k: 0.003, output_per_1k: 0.015 },
];

/// `(input_cost, output_cost, total_cost)` for a call with the given
/// token counts. Unknown `(provider, model)` pairs cost 0.
pub fn cost(provider: &str, model: &str, input_tokens: u64, output_tokens: u64) -> (f64, f64, f64) {
    let Some(price) = TABLE.iter().find(|p| p.provider == provider && p.model == model) else {
        return (0.0, 0.0, 0.0);
    };
    let input_cost = (input_tokens as f64 / 1000.0) * price.input_per_1k;
    let output_cost = (output_tokens as f64 / 1000.0) * price.output_per_1k;
    (input_cost, output_cost, input_cost + output_cost)
}
