/// Per-model token pricing in dollars per token.
#[derive(Debug, Clone)]
pub struct ModelPricing {
    pub model: &'static str,
    pub prompt_per_token: f64,
    pub completion_per_token: f64,
}

/// All known model pricing entries.
static PRICING_TABLE: &[ModelPricing] = &[
    ModelPricing {
        model: "gpt-3.5-turbo",
        prompt_per_token: 1.5e-6,
        completion_per_token: 2e-6,
    },
    ModelPricing {
        model: "gpt-3.5-turbo-16k",
        prompt_per_token: 3e-6,
        completion_per_token: 4e-6,
    },
    ModelPricing {
        model: "gpt-4",
        prompt_per_token: 3e-5,
        completion_per_token: 6e-5,
    },
    ModelPricing {
        model: "gpt-4-32k",
        prompt_per_token: 6e-5,
        completion_per_token: 1.2e-4,
    },
    ModelPricing {
        model: "gpt-4-turbo",
        prompt_per_token: 1e-5,
        completion_per_token: 3e-5,
    },
    ModelPricing {
        model: "gpt-4o",
        prompt_per_token: 2.5e-6,
        completion_per_token: 1e-5,
    },
    ModelPricing {
        model: "gpt-4o-mini",
        prompt_per_token: 1.5e-7,
        completion_per_token: 6e-7,
    },
];

/// Azure deployment names for the 3.5 family.
fn dealias(name: &str) -> &str {
    match name {
        "gpt-35-turbo" | "gpt35-turbo" | "gpt3-5" => "gpt-3.5-turbo",
        "gpt-35-turbo-16k" => "gpt-3.5-turbo-16k",
        _ => name,
    }
}

/// Normalize a model name to a pricing-table key.
/// Examples:
///   "azure/GPT3-5"   -> "gpt-3.5-turbo"  (Azure deployment alias)
///   "gpt-35-turbo"   -> "gpt-3.5-turbo"
///   "openai/gpt-4o"  -> "gpt-4o"
fn normalize_model(model: &str) -> String {
    let mut name = model.to_ascii_lowercase();

    for prefix in ["openai/", "azure/"] {
        if let Some(stripped) = name.strip_prefix(prefix) {
            name = stripped.to_string();
        }
    }

    dealias(&name).to_string()
}

/// Look up pricing for a model name. Returns None if unknown.
///
/// Trailing all-digit segments ("-0613", "-2024-05-13") are stripped one at a
/// time until a table entry matches, so dated snapshots price like their base
/// model. Aliases re-apply after each strip: "gpt-35-turbo-0613" becomes
/// "gpt-35-turbo", which is itself an alias.
pub fn lookup(model: &str) -> Option<&'static ModelPricing> {
    let mut name = normalize_model(model);
    loop {
        if let Some(pricing) = PRICING_TABLE.iter().find(|p| p.model == name) {
            return Some(pricing);
        }
        match name.rfind('-') {
            Some(idx)
                if idx + 1 < name.len()
                    && name[idx + 1..].chars().all(|c| c.is_ascii_digit()) =>
            {
                name.truncate(idx);
                name = dealias(&name).to_string();
            }
            _ => return None,
        }
    }
}

/// Cost in USD for the given token split.
pub fn calculate_cost(pricing: &ModelPricing, prompt_tokens: u64, completion_tokens: u64) -> f64 {
    prompt_tokens as f64 * pricing.prompt_per_token
        + completion_tokens as f64 * pricing.completion_per_token
}
