//! Frontier ordering strategies
//!
//! The frontier owns admission and the visited set; an ordering only decides which
//! admitted URL is claimed next.

use crate::config::CrawlStrategy;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

/// Ordering of pending URLs inside the frontier
pub trait FrontierOrder: Send {
    /// Adds an admitted URL
    fn push(&mut self, url: String);

    /// Removes the URL that should be claimed next
    fn pop(&mut self) -> Option<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the ordering for a configured strategy
pub fn order_for(strategy: CrawlStrategy, keyword: &str) -> Box<dyn FrontierOrder> {
    match strategy {
        CrawlStrategy::Bfs => Box::new(BreadthFirst::default()),
        CrawlStrategy::Msb => Box::new(KeywordPriority::new(keyword)),
    }
}

/// First in, first out
#[derive(Debug, Default)]
pub struct BreadthFirst {
    queue: VecDeque<String>,
}

impl FrontierOrder for BreadthFirst {
    fn push(&mut self, url: String) {
        self.queue.push_back(url);
    }

    fn pop(&mut self) -> Option<String> {
        self.queue.pop_front()
    }

    fn len(&self) -> usize {
        self.queue.len()
    }
}

/// A URL queued under the keyword-priority strategy
#[derive(Debug, Clone)]
struct ScoredUrl {
    url: String,

    /// Keyword occurrences in the URL (higher is claimed first)
    score: usize,

    /// Insertion order, used to keep ties FIFO
    seq: u64,
}

// BinaryHeap is a max-heap: higher scores pop first, then lower sequence numbers
impl Ord for ScoredUrl {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .cmp(&other.score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScoredUrl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScoredUrl {
    fn eq(&self, other: &Self) -> bool {
        self.score == other.score && self.seq == other.seq
    }
}

impl Eq for ScoredUrl {}

/// Claims URLs mentioning the crawl keyword most often first
#[derive(Debug)]
pub struct KeywordPriority {
    keyword: String,
    heap: BinaryHeap<ScoredUrl>,
    next_seq: u64,
}

impl KeywordPriority {
    pub fn new(keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl FrontierOrder for KeywordPriority {
    fn push(&mut self, url: String) {
        let score = count_keyword(&url, &self.keyword);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScoredUrl { url, score, seq });
    }

    fn pop(&mut self) -> Option<String> {
        self.heap.pop().map(|scored| scored.url)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// Counts case-insensitive, non-overlapping occurrences of `keyword` in `text`
///
/// An empty or blank keyword never matches.
pub fn count_keyword(text: &str, keyword: &str) -> usize {
    let needle = keyword.trim().to_lowercase();
    if needle.is_empty() {
        return 0;
    }
    text.to_lowercase().matches(needle.as_str()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(order: &mut dyn FrontierOrder) -> Vec<String> {
        std::iter::from_fn(|| order.pop()).collect()
    }

    #[test]
    fn test_count_keyword() {
        assert_eq!(count_keyword("Dairy news about dairy", "dairy"), 2);
        assert_eq!(count_keyword("https://x.com/DAIRY-farm", "Dairy"), 1);
        assert_eq!(count_keyword("nothing here", "dairy"), 0);
        assert_eq!(count_keyword("anything", ""), 0);
        assert_eq!(count_keyword("anything", "   "), 0);
    }

    #[test]
    fn test_breadth_first_is_fifo() {
        let mut order = BreadthFirst::default();
        order.push("a".to_string());
        order.push("b".to_string());
        order.push("c".to_string());

        assert_eq!(order.len(), 3);
        assert_eq!(drain(&mut order), vec!["a", "b", "c"]);
        assert!(order.is_empty());
    }

    #[test]
    fn test_keyword_priority_prefers_matches() {
        let mut order = KeywordPriority::new("dairy");
        order.push("http://x.com/weather".to_string());
        order.push("http://x.com/dairy".to_string());
        order.push("http://x.com/dairy/dairy-prices".to_string());

        assert_eq!(
            drain(&mut order),
            vec![
                "http://x.com/dairy/dairy-prices",
                "http://x.com/dairy",
                "http://x.com/weather",
            ]
        );
    }

    #[test]
    fn test_keyword_priority_ties_are_fifo() {
        let mut order = KeywordPriority::new("dairy");
        order.push("http://x.com/b".to_string());
        order.push("http://x.com/a".to_string());
        order.push("http://x.com/c".to_string());

        assert_eq!(
            drain(&mut order),
            vec!["http://x.com/b", "http://x.com/a", "http://x.com/c"]
        );
    }

    #[test]
    fn test_order_for_strategy() {
        let mut order = order_for(CrawlStrategy::Msb, "farm");
        order.push("http://x.com/news".to_string());
        order.push("http://x.com/farm".to_string());
        assert_eq!(order.pop().as_deref(), Some("http://x.com/farm"));

        let mut order = order_for(CrawlStrategy::Bfs, "farm");
        order.push("http://x.com/news".to_string());
        order.push("http://x.com/farm".to_string());
        assert_eq!(order.pop().as_deref(), Some("http://x.com/news"));
    }
}
