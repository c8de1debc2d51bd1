/// Prices are USD per million tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    /// Name of the model
    pub name: String,

    /// The maximum number of input tokens for the model
    pub input_tokens: usize,
    #[allow(dead_code)]
    pub output_tokens: usize,

    pub input_price: f64,
    pub output_price: f64,
}

/// Used for models missing from the table; priced like gpt-4o so unknown
/// models are not under-reported.
const FALLBACK_PRICE: (f64, f64) = (2.50, 10.00);

impl ModelInfo {
    pub fn new(name: &str) -> Self {
        match name {
            "gpt-4o" => Self::priced(name, 128_000, 16_384, 2.50, 10.00),
            "gpt-4o-mini" => Self::priced(name, 128_000, 16_384, 0.15, 0.60),
            "gpt-4.1" => Self::priced(name, 1_047_576, 32_768, 2.00, 8.00),
            "gpt-4.1-mini" => Self::priced(name, 1_047_576, 32_768, 0.40, 1.60),
            "gpt-4-turbo" => Self::priced(name, 128_000, 4_096, 10.00, 30.00),
            "gpt-4" => Self::priced(name, 8_192, 8_192, 30.00, 60.00),
            "gpt-3.5-turbo" => Self::priced(name, 16_385, 4_096, 0.50, 1.50),
            _ => Self::default(name),
        }
    }

    fn priced(name: &str, input: usize, output: usize, input_price: f64, output_price: f64) -> Self {
        ModelInfo {
            name: name.to_string(),
            input_tokens: input,
            output_tokens: output,
            input_price,
            output_price,
        }
    }

    fn default(name: &str) -> Self {
        Self::priced(name, 128_000, 4_096, FALLBACK_PRICE.0, FALLBACK_PRICE.1)
    }

    pub fn is_known(name: &str) -> bool {
        ModelInfo::new(name) != ModelInfo::default(name)
    }

    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 * self.input_price + output_tokens as f64 * self.output_price)
            / 1_000_000.0
    }
}
