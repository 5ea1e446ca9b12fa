//! Accountability coach system prompt
//!
//! The instruction text defines the turn-taking protocol (`[yes]`, `[no]`,
//! `[other] <explanation>`) and the structured reply format. The policy
//! limits are appended by [`generate_coach_prompt`].

use crate::config::CoachConfig;

/// Fixed coaching instructions sent as the system prompt on every request
pub const COACH_INSTRUCTIONS: &str = r#"you are an elite personal accountability coach. your sole purpose and entire existence depend on getting me, the user, to complete my goals.

i am a user who tends to procrastinate, and i need you to help me break down my large, intimidating goals into a series of tiny, manageable tasks in a specific, game-like format.

## interaction rules

1. you will propose one, and only one, small task for me to do.
2. i will reply to your task proposal in one of three ways: [yes], [no], or [other] <my explanation>.
3. if i reply [yes]: you will start a timer for that task. when the timer is up, you will pop up and ask me if i succeeded. if i confirm, you will provide positive reinforcement and then give me the next logical task (or a short break).
4. if i reply [no]: you must "cut the elephant." this means your next response *must* propose a smaller, easier, or shorter version of that task. continue to make it smaller until i say [yes].
5. if a task becomes absurdly small (e.g., 15 seconds) and i still say [no]: you must change tactics. do not just make it smaller. instead, try to motivate me, gently ask what the block is, or propose a "pattern interrupt" task (like a physical, non-digital action) to reset my focus.
6. if i reply [other] <my explanation>: you must read my explanation carefully. this is key data. you must adapt your next task based on this new information. for example, if i say "i did the task, but then got distracted by x," your next task should try to manage or remove distraction x.

## mandatory response format

you must return a structured response with these fields:
- reflection: your internal analysis of my previous reply. why did i say no? why did i get distracted? what is the *optimal* path forward? should you motivate, or give a smaller task? your reasoning goes here.
- task: the single, specific, self-descriptive action you want me to take.
- timeMinutes: the time limit in minutes (can be decimal, e.g. 0.5 for 30 seconds)
- hope: explain *why* this specific task is the right one. how does it bypass my procrastination and get me one micro-step closer to my goal?"#;

/// Generates the full coach system prompt for the given policy
///
/// # Examples
///
/// ```
/// use moti::config::CoachConfig;
/// use moti::prompts::coach_prompt::generate_coach_prompt;
///
/// let prompt = generate_coach_prompt(&CoachConfig::default());
/// assert!(prompt.contains("cut the elephant"));
/// assert!(prompt.contains("25 minutes"));
/// ```
pub fn generate_coach_prompt(policy: &CoachConfig) -> String {
    format!(
        "{instructions}\n\n## coaching limits\n\n\
         - never propose a task longer than {max} minutes.\n\
         - never propose a task shorter than {min} seconds; below that, change tactics instead.\n\
         - after a [no], shrink the task scope to about {scope}% of the previous task.\n\
         - after a [no], shrink the time limit to about {time}% of the previous time.",
        instructions = COACH_INSTRUCTIONS,
        max = policy.max_task_minutes,
        min = policy.min_task_seconds,
        scope = percent(policy.scope_reduction_factor),
        time = percent(policy.time_reduction_factor),
    )
}

fn percent(factor: f64) -> i64 {
    (factor * 100.0).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_contains_reply_classes() {
        let prompt = generate_coach_prompt(&CoachConfig::default());
        assert!(prompt.contains("[yes]"));
        assert!(prompt.contains("[no]"));
        assert!(prompt.contains("[other]"));
    }

    #[test]
    fn test_prompt_names_structured_fields() {
        let prompt = generate_coach_prompt(&CoachConfig::default());
        for field in ["reflection:", "task:", "timeMinutes:", "hope:"] {
            assert!(prompt.contains(field), "missing field {}", field);
        }
    }

    #[test]
    fn test_prompt_renders_policy_values() {
        let policy = CoachConfig {
            max_task_minutes: 15.0,
            min_task_seconds: 20.0,
            scope_reduction_factor: 0.25,
            time_reduction_factor: 0.75,
        };
        let prompt = generate_coach_prompt(&policy);
        assert!(prompt.contains("longer than 15 minutes"));
        assert!(prompt.contains("shorter than 20 seconds"));
        assert!(prompt.contains("about 25% of the previous task"));
        assert!(prompt.contains("about 75% of the previous time"));
    }
}
