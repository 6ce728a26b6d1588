//! Typed shape of a completed analysis report as returned by the backend.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl IssueSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueSeverity::Low => "low",
            IssueSeverity::Medium => "medium",
            IssueSeverity::High => "high",
            IssueSeverity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Security,
    Performance,
    Quality,
    Style,
    Bug,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueKind::Security => "security",
            IssueKind::Performance => "performance",
            IssueKind::Quality => "quality",
            IssueKind::Style => "style",
            IssueKind::Bug => "bug",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub overview: Overview,
    pub categories: Categories,
    pub file_analysis: Vec<FileAnalysis>,
    pub recommendations: Recommendations,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_issues: Option<GithubIssuesReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_files: u32,
    pub lines_of_code: u64,
    pub overall_score: f64,
    pub risk_level: RiskLevel,
    pub repository_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Categories {
    pub code_quality: CategoryScore,
    pub security: CategoryScore,
    pub performance: CategoryScore,
    pub maintainability: CategoryScore,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryScore {
    pub score: f64,
    pub issues: u32,
    pub critical_issues: u32,
    pub suggestions: Vec<String>,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileAnalysis {
    pub file_path: String,
    pub score: f64,
    pub issues: Vec<FileIssue>,
    pub suggestions: Vec<String>,
    pub complexity: Complexity,
    pub maintainability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(rename = "type")]
    pub issue_type: IssueKind,
    pub severity: IssueSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<IssueSuggestion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssueSuggestion {
    pub description: String,
    pub original_code: String,
    pub fixed_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub immediate: Vec<String>,
    pub short_term: Vec<String>,
    pub long_term: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GithubIssuesReport {
    pub total_issues: u32,
    pub analyses: Vec<GithubIssueAnalysis>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GithubIssueAnalysis {
    pub issue: GithubIssue,
    pub category: String,
    pub priority: String,
    pub related_files: Vec<String>,
    pub estimated_effort: String,
    pub solution: IssueSolution,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GithubIssue {
    pub id: u64,
    pub number: u32,
    pub title: String,
    pub body: String,
    pub state: IssueState,
    pub author: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssueSolution {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_code: Option<String>,
}

#[cfg(test)]
pub(crate) const SAMPLE_REPORT_JSON: &str = r#"{
        "overview": {
            "totalFiles": 42,
            "linesOfCode": 12890,
            "overallScore": 78,
            "riskLevel": "medium",
            "repositoryName": "acme/widget"
        },
        "categories": {
            "codeQuality": {
                "score": 81,
                "issues": 7,
                "criticalIssues": 0,
                "suggestions": ["Extract duplicated parsing logic"],
                "details": ["7 quality issues across 4 files"]
            },
            "security": {
                "score": 65,
                "issues": 3,
                "criticalIssues": 1,
                "suggestions": ["Parameterize SQL queries"],
                "details": ["1 critical injection vector"]
            },
            "performance": {
                "score": 88,
                "issues": 1,
                "criticalIssues": 0,
                "suggestions": [],
                "details": []
            },
            "maintainability": {
                "score": 74,
                "issues": 5,
                "criticalIssues": 0,
                "suggestions": [],
                "details": []
            }
        },
        "fileAnalysis": [
            {
                "filePath": "src/db.py",
                "score": 54,
                "issues": [
                    {
                        "line": 118,
                        "type": "security",
                        "severity": "critical",
                        "message": "String-built SQL allows injection",
                        "suggestion": {
                            "description": "Use bound parameters",
                            "originalCode": "cur.execute(f\"SELECT * FROM users WHERE id = {uid}\")",
                            "fixedCode": "cur.execute(\"SELECT * FROM users WHERE id = ?\", (uid,))"
                        }
                    }
                ],
                "suggestions": ["Split query helpers into a module"],
                "complexity": "high",
                "maintainability": 48
            }
        ],
        "recommendations": {
            "immediate": ["Fix the SQL injection in src/db.py"],
            "shortTerm": ["Add input validation"],
            "longTerm": ["Introduce a query builder"]
        },
        "githubIssues": {
            "totalIssues": 2,
            "analyses": [
                {
                    "issue": {
                        "id": 991,
                        "number": 17,
                        "title": "Crash on empty config",
                        "body": "Startup fails when config.toml is empty",
                        "state": "open",
                        "author": "octocat",
                        "url": "https://github.com/acme/widget/issues/17"
                    },
                    "category": "bug",
                    "priority": "high",
                    "relatedFiles": ["src/config.py"],
                    "estimatedEffort": "low",
                    "solution": {
                        "summary": "Guard against empty config files",
                        "filePath": "src/config.py"
                    }
                }
            ]
        }
    }"#;
