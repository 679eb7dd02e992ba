//! Properties that hold for any input the cascade can see.

use clerk_core::classify::{CustomKeywords, HeuristicsAnalyzer};
use clerk_core::{
    CancellationToken, ClassificationMethod, Classifier, ClassifierConfig, CommitClassification,
    CommitInfo, CommitType, FilterOptions, ParsedCommit, filter,
};
use proptest::prelude::*;

/// Reports whatever confidence is encoded in the message, even out of range.
struct EchoHeuristics;

impl HeuristicsAnalyzer for EchoHeuristics {
    fn classify(
        &self,
        commit: &CommitInfo,
        _keywords: &CustomKeywords,
    ) -> Option<CommitClassification> {
        let confidence: f64 = commit.message.parse().ok()?;
        let mut classification = CommitClassification::new(
            commit.hash.clone(),
            CommitType::Chore,
            ClassificationMethod::Heuristic,
            0.0,
        );
        // Bypass the constructor clamp to mimic a sloppy collaborator.
        classification.confidence = confidence;
        Some(classification)
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn classifier(min_confidence: f64) -> Classifier {
    Classifier::builder(ClassifierConfig {
        min_confidence,
        ..ClassifierConfig::default()
    })
    .with_heuristics(EchoHeuristics)
    .build()
    .unwrap()
}

fn message_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        (-5.0f64..5.0).prop_map(|c| c.to_string()),
        Just("NaN".to_string()),
        "(feat|fix|docs|perf)(\\([a-z]{1,6}\\))?!?: [a-z ]{1,20}",
        "[A-Za-z ]{0,20}",
    ]
}

fn type_strategy() -> impl Strategy<Value = CommitType> {
    proptest::sample::select(CommitType::ALL.to_vec())
}

fn parsed_strategy() -> impl Strategy<Value = ParsedCommit> {
    (
        type_strategy(),
        proptest::option::of(proptest::sample::select(vec!["api", "cli", "core"])),
        any::<bool>(),
        proptest::sample::select(vec!["ana", "ben", "bot"]),
    )
        .prop_map(|(commit_type, scope, breaking, author)| ParsedCommit {
            commit_type,
            scope: scope.map(str::to_string),
            breaking,
            is_conventional: !commit_type.is_unknown(),
            author: Some(author.to_string()),
            description: "change".into(),
            ..ParsedCommit::default()
        })
}

proptest! {
    #[test]
    fn confidence_always_in_unit_range(messages in proptest::collection::vec(message_strategy(), 1..10)) {
        let commits: Vec<_> = messages
            .iter()
            .enumerate()
            .map(|(i, m)| CommitInfo::new(format!("c{i}"), m.clone()))
            .collect();
        let result = runtime()
            .block_on(classifier(0.7).analyze_all(&CancellationToken::new(), &commits))
            .unwrap();

        prop_assert_eq!(result.stats.total_commits, commits.len());
        let mut sum = 0.0;
        for commit in &commits {
            let classification = result.get(&commit.hash).unwrap();
            prop_assert!((0.0..=1.0).contains(&classification.confidence));
            sum += classification.confidence;
        }
        let mean = sum / commits.len() as f64;
        prop_assert!((result.stats.average_confidence - mean).abs() < 1e-9);
    }

    #[test]
    fn conventional_subjects_classify_with_full_confidence(
        commit_type in type_strategy(),
        scope in proptest::option::of("[a-z]{1,8}"),
        bang in any::<bool>(),
        description in "[a-z][a-z ]{0,30}",
    ) {
        let scope = scope.map(|s| format!("({s})")).unwrap_or_default();
        let bang = if bang { "!" } else { "" };
        let message = format!("{commit_type}{scope}{bang}: {description}");
        let commit = CommitInfo::new("p1", message);

        let classification = runtime()
            .block_on(classifier(0.7).analyze(&CancellationToken::new(), &commit))
            .unwrap();
        prop_assert_eq!(classification.method, ClassificationMethod::Conventional);
        prop_assert_eq!(classification.commit_type, commit_type);
        prop_assert!((classification.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn filter_is_conjunction_of_predicates(
        commits in proptest::collection::vec(parsed_strategy(), 0..20),
        types in proptest::collection::vec(type_strategy(), 0..3),
        exclude_bot in any::<bool>(),
        only_breaking in any::<bool>(),
    ) {
        let options = FilterOptions {
            types: types.clone(),
            exclude_authors: if exclude_bot { vec!["bot".into()] } else { Vec::new() },
            only_breaking,
            ..FilterOptions::default()
        };
        let expected: Vec<_> = commits
            .iter()
            .filter(|c| c.is_conventional)
            .filter(|c| types.is_empty() || types.contains(&c.commit_type))
            .filter(|c| !(exclude_bot && c.author.as_deref() == Some("bot")))
            .filter(|c| !only_breaking || c.breaking)
            .cloned()
            .collect();

        prop_assert_eq!(filter(&commits, &options), expected);
    }
}
