//! Behavioral interview question bank

pub const BEHAVIORAL_QUESTIONS: [&str; 10] = [
    "Can you explain a challenging technical problem you've solved and walk me through your problem-solving approach?",
    "Tell me about a time when you had to work with a difficult team member. How did you handle it?",
    "Describe a situation where you had to meet a tight deadline. How did you manage your time?",
    "Give an example of a time you made a mistake. How did you handle it?",
    "Tell me about a time you had to learn a new technology quickly. What was your approach?",
    "Describe a situation where you had to explain a complex technical concept to a non-technical person.",
    "Tell me about a project you're most proud of and why.",
    "How do you handle disagreements with coworkers?",
    "Describe a time when you had to make a difficult decision without all the information you needed.",
    "Tell me about a time you received critical feedback and how you responded to it.",
];

/// Question at `index`, wrapping past the end of the bank
pub fn question(index: usize) -> &'static str {
    BEHAVIORAL_QUESTIONS[index % BEHAVIORAL_QUESTIONS.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_wraps() {
        assert_eq!(question(0), BEHAVIORAL_QUESTIONS[0]);
        assert_eq!(question(9), BEHAVIORAL_QUESTIONS[9]);
        assert_eq!(question(12), BEHAVIORAL_QUESTIONS[2]);
    }
}
