#![no_main]

use libfuzzer_sys::fuzz_target;
use ranklab::analyzers::{Analyzer, FilterChain, NgramWordAnalyzer};

fuzz_target!(|text: &str| {
    for n in 1..=3 {
        let analyzer = NgramWordAnalyzer::new(n, FilterChain::default_chain()).unwrap();
        let features = analyzer.analyze(text);
        assert!(features.iter().all(|(_, count)| count > 0));
    }
});
