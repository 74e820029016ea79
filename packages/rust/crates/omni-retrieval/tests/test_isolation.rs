#![allow(missing_docs)]

//! Seeded randomized checks of the isolation, ordering, dedup, and
//! determinism guarantees across every scope mode, with backends that leak
//! foreign hits on purpose.

use std::collections::{BTreeSet, HashSet};

use omni_retrieval::test_support::{
    ScriptedClients, ScriptedEmbedder, ScriptedKeywordSearch, ScriptedVectorStore,
    StaticDirectory, keyword_hit, vector_hit,
};
use omni_retrieval::{
    KeywordHit, Namespace, RetrievalConfig, RetrievalEngine, RetrievalError, RetrievalOutcome,
    RetrievalWarning, RetrieveRequest, ScopeMode, VectorHit,
};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio_util::sync::CancellationToken;

const TENANTS: &[&str] = &["alice", "bob", "carol"];
const KNOWLEDGE_BASES: &[&str] = &["hr", "finance", "eng"];
const WORDS: &[&str] = &[
    "vacation", "policy", "budget", "roadmap", "contact", "smith", "invoice", "release",
];
const SCOPES: &[ScopeMode] = &[
    ScopeMode::Unified,
    ScopeMode::UserOnly,
    ScopeMode::SystemOnly,
    ScopeMode::SpecificKb,
];

fn all_namespaces() -> Vec<Namespace> {
    let mut namespaces: Vec<Namespace> = TENANTS.iter().map(|t| Namespace::personal(t)).collect();
    namespaces.push(Namespace::system());
    namespaces.extend(KNOWLEDGE_BASES.iter().map(|kb| Namespace::knowledge_base(kb)));
    namespaces
}

/// File identifiers embed their namespace so results can be traced back.
fn file_for(namespace: &Namespace, n: usize) -> String {
    format!("{namespace}/doc-{n}.md")
}

fn namespace_of(file_identifier: &str) -> &str {
    file_identifier
        .rsplit_once('/')
        .map_or(file_identifier, |(namespace, _)| namespace)
}

fn snippet(rng: &mut StdRng) -> String {
    (0..rng.gen_range(2..6))
        .map(|_| WORDS[rng.gen_range(0..WORDS.len())])
        .collect::<Vec<_>>()
        .join(" ")
}

struct Corpus {
    vector: Vec<(Namespace, Vec<VectorHit>)>,
    keyword: Vec<KeywordHit>,
    leaked_vector: Vec<VectorHit>,
    leaked_keyword: Vec<KeywordHit>,
    grants: Vec<(String, String)>,
}

fn random_corpus(rng: &mut StdRng) -> Corpus {
    let namespaces = all_namespaces();
    let mut vector = Vec::new();
    let mut keyword = Vec::new();
    for namespace in &namespaces {
        let mut hits = Vec::new();
        for i in 0..rng.gen_range(0..8) {
            let file = file_for(namespace, rng.gen_range(0..4));
            let text = snippet(rng);
            let id = format!("{namespace}#{i}");
            if rng.gen_bool(0.4) {
                keyword.push(keyword_hit(&id, namespace, &file, &text));
            }
            hits.push(vector_hit(&id, namespace, &file, rng.r#gen::<f32>(), &text));
        }
        vector.push((namespace.clone(), hits));
    }

    let mut leaked_vector = Vec::new();
    let mut leaked_keyword = Vec::new();
    for i in 0..rng.gen_range(1..4) {
        let namespace = &namespaces[rng.gen_range(0..namespaces.len())];
        let file = file_for(namespace, 9);
        let id = format!("leak#{i}");
        leaked_vector.push(vector_hit(&id, namespace, &file, 0.99, "leaked secret"));
        leaked_keyword.push(keyword_hit(&id, namespace, &file, "leaked secret"));
    }

    let mut grants = Vec::new();
    for tenant in TENANTS {
        for kb in KNOWLEDGE_BASES {
            if rng.gen_bool(0.3) {
                grants.push(((*tenant).to_string(), (*kb).to_string()));
            }
        }
    }

    Corpus {
        vector,
        keyword,
        leaked_vector,
        leaked_keyword,
        grants,
    }
}

fn fakes_for(corpus: &Corpus, rng: Option<&mut StdRng>) -> ScriptedClients {
    let mut vector_sets = corpus.vector.clone();
    let mut keyword = corpus.keyword.clone();
    if let Some(rng) = rng {
        vector_sets.shuffle(rng);
        for (_, hits) in &mut vector_sets {
            hits.shuffle(rng);
        }
        keyword.shuffle(rng);
    }

    let mut store = ScriptedVectorStore::new();
    for (namespace, hits) in vector_sets {
        store = store.with_hits(&namespace, hits);
    }
    for hit in &corpus.leaked_vector {
        store = store.injecting(hit.clone());
    }
    let mut search = ScriptedKeywordSearch::new().with_hits(keyword);
    for hit in &corpus.leaked_keyword {
        search = search.injecting(hit.clone());
    }
    let mut directory = StaticDirectory::new();
    for (tenant, kb) in &corpus.grants {
        directory = directory.granting(tenant, kb);
    }
    ScriptedClients::new(
        ScriptedEmbedder::returning(vec![0.5, 0.5]),
        store,
        search,
        directory,
    )
}

fn expected_scope(corpus: &Corpus, request: &RetrieveRequest) -> Option<BTreeSet<String>> {
    let tenant = request.tenant_id.as_str();
    let keys: Vec<Namespace> = match request.scope {
        ScopeMode::Unified => vec![Namespace::personal(tenant), Namespace::system()],
        ScopeMode::UserOnly => vec![Namespace::personal(tenant)],
        ScopeMode::SystemOnly => vec![Namespace::system()],
        ScopeMode::SpecificKb => {
            let kb = request.kb_id.as_deref()?;
            if !corpus
                .grants
                .iter()
                .any(|(t, k)| t == tenant && k == kb)
            {
                return None;
            }
            vec![Namespace::knowledge_base(kb)]
        }
    };
    Some(keys.iter().map(ToString::to_string).collect())
}

fn random_request(rng: &mut StdRng) -> RetrieveRequest {
    let scope = SCOPES[rng.gen_range(0..SCOPES.len())];
    let tenant = TENANTS[rng.gen_range(0..TENANTS.len())];
    let query = format!(
        "{} {}",
        WORDS[rng.gen_range(0..WORDS.len())],
        WORDS[rng.gen_range(0..WORDS.len())]
    );
    let mut request = RetrieveRequest::new(query, scope, tenant).with_top_k(rng.gen_range(1..12));
    if scope == ScopeMode::SpecificKb {
        request = request.with_kb(KNOWLEDGE_BASES[rng.gen_range(0..KNOWLEDGE_BASES.len())]);
    }
    request
}

async fn run(
    fakes: &ScriptedClients,
    request: &RetrieveRequest,
) -> Result<RetrievalOutcome, RetrievalError> {
    RetrievalEngine::new(fakes.clients(), RetrievalConfig::default())
        .expect("default config is valid")
        .retrieve(request, &CancellationToken::new())
        .await
}

fn assert_invariants(outcome: &RetrievalOutcome, scope: &BTreeSet<String>, top_k: usize) {
    for result in &outcome.results {
        assert!(
            scope.contains(namespace_of(&result.file_identifier)),
            "leaked {} outside {scope:?}",
            result.file_identifier
        );
        assert!((0.0..=1.0).contains(&result.final_score));
    }
    assert!(
        outcome
            .results
            .windows(2)
            .all(|pair| pair[0].final_score >= pair[1].final_score),
        "results not sorted by score"
    );
    let files: HashSet<&str> = outcome
        .results
        .iter()
        .map(|result| result.file_identifier.as_str())
        .collect();
    assert_eq!(files.len(), outcome.results.len(), "duplicate file identifiers");
    assert!(outcome.results.len() <= top_k);
}

#[tokio::test]
async fn randomized_requests_never_leak_across_namespaces() {
    for seed in 0..48_u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let corpus = random_corpus(&mut rng);
        let fakes = fakes_for(&corpus, None);

        for _ in 0..6 {
            let request = random_request(&mut rng);
            let result = run(&fakes, &request).await;
            match expected_scope(&corpus, &request) {
                Some(scope) => {
                    let outcome = result.expect("in-scope request succeeds");
                    assert_invariants(&outcome, &scope, request.top_k.unwrap_or(5));
                    let foreign_leaks = corpus
                        .leaked_vector
                        .iter()
                        .filter(|hit| !scope.contains(hit.namespace.as_str()))
                        .count();
                    let violations = outcome
                        .warnings
                        .iter()
                        .filter(|warning| {
                            matches!(warning, RetrievalWarning::ContaminationViolationDetected { .. })
                        })
                        .count();
                    if foreign_leaks > 0 {
                        assert!(violations > 0, "seed {seed}: leak not reported");
                    }
                }
                None => {
                    assert!(
                        matches!(result, Err(RetrievalError::InvalidScope { .. })),
                        "seed {seed}: foreign kb accepted"
                    );
                }
            }
        }
    }
}

#[tokio::test]
async fn arrival_order_does_not_change_results() {
    for seed in 100..132_u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let corpus = random_corpus(&mut rng);
        let request = random_request(&mut rng);
        if expected_scope(&corpus, &request).is_none() {
            continue;
        }

        let baseline = run(&fakes_for(&corpus, None), &request)
            .await
            .expect("baseline succeeds");
        let repeated = run(&fakes_for(&corpus, None), &request)
            .await
            .expect("repeat succeeds");
        let shuffled = run(&fakes_for(&corpus, Some(&mut rng)), &request)
            .await
            .expect("shuffled succeeds");

        assert_eq!(baseline.results, repeated.results, "seed {seed}");
        assert_eq!(baseline.results, shuffled.results, "seed {seed}");
    }
}
