pub mod analysis;
pub mod report;

pub use analysis::{Analysis, AnalysisStatus};
pub use report::{
    Categories, CategoryScore, Complexity, FileAnalysis, FileIssue, FinalReport, GithubIssue,
    GithubIssueAnalysis, GithubIssuesReport, IssueKind, IssueSeverity, IssueSolution, IssueState,
    IssueSuggestion, Overview, Recommendations, RiskLevel,
};
