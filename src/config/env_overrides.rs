use super::Config;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        let non_empty = |name: &str| std::env::var(name).ok().filter(|value| !value.is_empty());
        if let Some(key) =
            non_empty("STEPWISE_SEARCH_API_KEY").or_else(|| non_empty("SEARCH_API_KEY"))
        {
            self.tools.web_search.api_key = Some(key);
        }

        if let Ok(steps) = std::env::var("STEPWISE_MAX_STEPS")
            && let Ok(steps) = steps.parse::<usize>()
            && steps > 0
        {
            self.execution.max_steps = steps;
        }

        if let Ok(secs) = std::env::var("STEPWISE_PLAN_TIMEOUT_SECS")
            && let Ok(secs) = secs.parse::<u64>()
            && secs > 0
        {
            self.execution.plan_timeout_secs = secs;
        }

        if let Ok(level) = std::env::var("STEPWISE_LOG_LEVEL")
            && !level.is_empty()
        {
            self.logging.level = level.to_ascii_lowercase();
        }
    }
}
