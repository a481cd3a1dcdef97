//! Rebuilds the conversational structure of pull request review comments.
//!
//! The API returns review comments as a flat list where replies point at
//! their parent through `in_reply_to_id`. The overlay wants threads: top
//! level comments with their replies nested beneath them.

use std::collections::HashMap;

use crate::github::models::{Review, ReviewComment};

#[derive(Debug, Clone)]
pub struct ReviewThread {
    pub comment: ReviewComment,
    pub replies: Vec<ReviewThread>,
}

impl ReviewThread {
    fn new(comment: ReviewComment) -> Self {
        Self { comment, replies: Vec::new() }
    }
}

/// Links every reply under its parent and returns only the top level threads,
/// in the order their comments appear across the reviews. A reply whose
/// parent is missing from the input is treated as top level rather than
/// dropped.
pub fn build_review_threads(reviews: &[Review]) -> Vec<ReviewThread> {
    let mut nodes: HashMap<u64, ReviewThread> = HashMap::new();
    let mut order: Vec<u64> = Vec::new();
    for review in reviews {
        for comment in &review.comments {
            order.push(comment.comment.id);
            nodes.insert(comment.comment.id, ReviewThread::new(comment.clone()));
        }
    }

    // Detach replies deepest-first so a whole reply chain folds up under its
    // top level comment. Replies come after their parents in comment order,
    // so walking the order backwards guarantees a reply's parent is still in
    // the map when the reply is moved.
    let mut roots: Vec<u64> = Vec::new();
    for id in order.iter().rev() {
        let parent = nodes.get(id).and_then(|node| node.comment.in_reply_to_id);
        match parent {
            Some(parent_id) if parent_id != *id && nodes.contains_key(&parent_id) => {
                if let Some(child) = nodes.remove(id) {
                    if let Some(parent_node) = nodes.get_mut(&parent_id) {
                        // Front insertion keeps replies in their original
                        // order despite the reversed walk.
                        parent_node.replies.insert(0, child);
                    }
                }
            },
            Some(_) | None => roots.push(*id),
        }
    }

    roots.reverse();
    roots.into_iter().filter_map(|id| nodes.remove(&id)).collect()
}

/// Flattens threads into (depth, comment) pairs for rendering as an indented
/// list.
pub fn flatten_threads(threads: &[ReviewThread]) -> Vec<(usize, &ReviewComment)> {
    fn walk<'a>(thread: &'a ReviewThread, depth: usize, out: &mut Vec<(usize, &'a ReviewComment)>) {
        out.push((depth, &thread.comment));
        for reply in &thread.replies {
            walk(reply, depth + 1, out);
        }
    }
    let mut out = Vec::new();
    for thread in threads {
        walk(thread, 0, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::github::models::{IssueComment, ReviewState, User};

    fn user() -> User {
        User { login: "octocat".into(), id: 1, name: None, html_url: String::new() }
    }

    fn comment(id: u64, in_reply_to_id: Option<u64>) -> ReviewComment {
        ReviewComment {
            comment: IssueComment {
                id,
                body: format!("comment {id}"),
                user: Some(user()),
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
            pull_request_review_id: 99,
            path: "src/main.rs".into(),
            position: Some(1),
            in_reply_to_id,
        }
    }

    fn review(comments: Vec<ReviewComment>) -> Review {
        Review {
            id: 99,
            user: user(),
            body: "looks good".into(),
            state: ReviewState::Commented,
            comments,
            submitted_at: None,
        }
    }

    #[test]
    fn test_replies_nest_under_their_parent() {
        let reviews = vec![review(vec![comment(1, None), comment(2, Some(1)), comment(3, Some(2))])];
        let threads = build_review_threads(&reviews);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].comment.comment.id, 1);
        assert_eq!(threads[0].replies.len(), 1);
        assert_eq!(threads[0].replies[0].comment.comment.id, 2);
        assert_eq!(threads[0].replies[0].replies[0].comment.comment.id, 3);
    }

    #[test]
    fn test_independent_comments_stay_top_level() {
        let reviews = vec![review(vec![comment(1, None), comment(2, None)])];
        let threads = build_review_threads(&reviews);
        assert_eq!(threads.len(), 2);
    }

    #[test]
    fn test_reply_to_missing_parent_is_not_dropped() {
        let reviews = vec![review(vec![comment(5, Some(1000))])];
        let threads = build_review_threads(&reviews);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].comment.comment.id, 5);
    }

    #[test]
    fn test_flatten_reports_depth() {
        let reviews = vec![review(vec![comment(1, None), comment(2, Some(1)), comment(3, None)])];
        let threads = build_review_threads(&reviews);
        let flat = flatten_threads(&threads);
        let ids_and_depths: Vec<(usize, u64)> = flat.iter().map(|(d, c)| (*d, c.comment.id)).collect();
        assert_eq!(ids_and_depths, vec![(0, 1), (1, 2), (0, 3)]);
    }
}
