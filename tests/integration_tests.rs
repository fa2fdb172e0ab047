//! Integration tests for the private lending protocol.
//!
//! These tests drive complete loan lifecycles through the state machine,
//! first with allow-list verifiers and then with real Groth16 proofs.

use std::sync::{Arc, Mutex};

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, ProvingKey};
use ark_relations::lc;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError, Variable};
use ark_snark::{CircuitSpecificSetupSNARK, SNARK};
use ark_std::rand::rngs::StdRng;
use ark_std::rand::SeedableRng;

use private_lending::core::config::{LendingConfig, ReapprovalPolicy, StorageFormat};
use private_lending::core::loan::{LoanRecord, LoanStatus};
use private_lending::error::Error;
use private_lending::protocol::events::LendingEvent;
use private_lending::protocol::operations::{CalculateInterestOp, RequestLoanOp};
use private_lending::protocol::state_machine::{LendingStateMachine, OperationResult};
use private_lending::storage::backend::{FileStore, InMemoryStore, StorageBackend};
use private_lending::utils::crypto::Address;
use private_lending::zkp::groth16::{encode_proof, Groth16Verifier};
use private_lending::zkp::proof::{FieldElement, Groth16Proof};
use private_lending::zkp::schema::ProofKind;
use private_lending::zkp::verifier::{AllowListVerifier, StaticVerifier};

// ═══════════════════════════════════════════════════════════════════════════════
// TEST HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

const COLLATERAL_INPUT: [u64; 7] = [1, 1, 5000, 150, 10000, 8000, 2];
const INTEREST_INPUT: [u64; 7] = [75, 1, 5000, 6000, 5, 30, 120];

fn inputs(values: [u64; 7]) -> Vec<FieldElement> {
    values.iter().map(|v| FieldElement::from_u64(*v)).collect()
}

fn fixture_proof(values: [u64; 7]) -> Groth16Proof {
    Groth16Proof::default().with_input(inputs(values))
}

fn zero_input(proof: &Groth16Proof) -> Groth16Proof {
    proof.with_input(vec![FieldElement::ZERO; 7])
}

/// Machine whose verifiers accept exactly the fixture proofs of scenarios A and B
fn allow_list_machine() -> LendingStateMachine<InMemoryStore> {
    let collateral = AllowListVerifier::new().with_proof(&fixture_proof(COLLATERAL_INPUT));
    let interest = AllowListVerifier::new().with_proof(&fixture_proof(INTEREST_INPUT));
    LendingStateMachine::new(
        InMemoryStore::new(),
        collateral,
        interest,
        LendingConfig::default(),
    )
}

fn recorded_events<B: StorageBackend>(
    machine: &mut LendingStateMachine<B>,
) -> Arc<Mutex<Vec<LendingEvent>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    machine.subscribe(move |event: &LendingEvent| sink.lock().unwrap().push(event.clone()));
    seen
}

/// Seven public inputs, each bound to a witness copy, plus one product
#[derive(Clone)]
struct LendingCircuit {
    inputs: [u64; 7],
}

impl ConstraintSynthesizer<Fr> for LendingCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let mut publics = Vec::with_capacity(7);
        for value in self.inputs {
            let public = cs.new_input_variable(|| Ok(Fr::from(value)))?;
            let private = cs.new_witness_variable(|| Ok(Fr::from(value)))?;
            cs.enforce_constraint(lc!() + private, lc!() + Variable::One, lc!() + public)?;
            publics.push(public);
        }
        let product = self.inputs[0] as u128 * self.inputs[1] as u128;
        let product = cs.new_witness_variable(|| Ok(Fr::from(product)))?;
        cs.enforce_constraint(lc!() + publics[0], lc!() + publics[1], lc!() + product)?;
        Ok(())
    }
}

/// Proving key plus the verifier for one circuit instance
struct Prover {
    pk: ProvingKey<Bn254>,
    verifier: Groth16Verifier,
}

impl Prover {
    fn setup(rng: &mut StdRng) -> Self {
        let circuit = LendingCircuit { inputs: [0; 7] };
        let (pk, vk) = Groth16::<Bn254>::circuit_specific_setup(circuit, rng).unwrap();
        Self {
            pk,
            verifier: Groth16Verifier::new(vk),
        }
    }

    fn prove(&self, rng: &mut StdRng, values: [u64; 7]) -> Groth16Proof {
        let proof = Groth16::<Bn254>::prove(&self.pk, LendingCircuit { inputs: values }, rng).unwrap();
        let publics: Vec<Fr> = values.iter().map(|v| Fr::from(*v)).collect();
        encode_proof(&proof, &publics)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOAN LIFECYCLE TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_full_loan_lifecycle() {
    let mut machine = allow_list_machine();
    let events = recorded_events(&mut machine);
    let borrower = Address::from_label("alice");

    machine.begin_block(100, 1_700_000_000);

    // Scenario A: collateral proof approves the loan
    let approved = machine
        .request_loan(&borrower, &fixture_proof(COLLATERAL_INPUT))
        .unwrap();
    assert_eq!(approved.loan_amount, 5000);
    assert_eq!(approved.collateral_amount, 8000);
    assert!(!approved.replaced_existing);

    let record = machine.get_loan_details(&borrower).unwrap();
    assert_eq!(record.loan_amount, 5000);
    assert_eq!(record.collateral_amount, 8000);
    assert!(record.is_loan_approved);
    assert_eq!(record.status(), LoanStatus::Approved);

    // Scenario B: interest proof marks the position liquidatable
    let interest = machine
        .calculate_interest_and_check_liquidation(&borrower, &fixture_proof(INTEREST_INPUT))
        .unwrap();
    assert_eq!(interest.accrued_interest, 75);
    assert!(interest.is_liquidatable);
    assert!(interest.liquidation_changed);

    let record = machine.get_loan_details(&borrower).unwrap();
    assert_eq!(
        record,
        LoanRecord {
            loan_amount: 5000,
            collateral_amount: 8000,
            accrued_interest: 75,
            is_loan_approved: true,
            is_liquidatable: true,
        }
    );
    assert_eq!(record.status(), LoanStatus::Liquidatable);

    let seen = events.lock().unwrap();
    let rendered: Vec<String> = seen.iter().map(|e| e.to_string()).collect();
    assert_eq!(
        rendered,
        vec![
            format!("LoanApproved({}, 5000, 8000)", borrower),
            format!("InterestCalculated({}, 75, true)", borrower),
        ]
    );
    assert!(seen.iter().all(|e| e.block_height() == 100));
    assert!(seen.iter().all(|e| e.timestamp() == 1_700_000_000));
    drop(seen);

    let log = machine.end_block().unwrap();
    assert_eq!(log.len(), 2);
    assert!(machine.events().is_empty());
}

#[test]
fn test_rejected_collateral_proof_leaves_ledger_unchanged() {
    let mut machine = allow_list_machine();
    let events = recorded_events(&mut machine);
    let borrower = Address::from_label("alice");

    // Scenario C
    let err = machine
        .request_loan(&borrower, &zero_input(&fixture_proof(COLLATERAL_INPUT)))
        .unwrap_err();
    assert_eq!(err, Error::InvalidProof { kind: ProofKind::Collateral });
    assert_eq!(err.to_string(), "Invalid collateral zk-SNARK proof");

    assert_eq!(machine.get_loan_details(&borrower).unwrap(), LoanRecord::default());
    assert!(machine.borrowers().unwrap().is_empty());
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn test_rejected_interest_proof_keeps_prior_values() {
    let mut machine = allow_list_machine();
    let borrower = Address::from_label("alice");

    machine
        .request_loan(&borrower, &fixture_proof(COLLATERAL_INPUT))
        .unwrap();
    let before = machine.get_loan_details(&borrower).unwrap();

    // Scenario D
    let err = machine
        .calculate_interest_and_check_liquidation(
            &borrower,
            &zero_input(&fixture_proof(INTEREST_INPUT)),
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid interest liquidation zk-SNARK proof");
    assert_eq!(machine.get_loan_details(&borrower).unwrap(), before);
    assert_eq!(machine.events().len(), 1);
}

#[test]
fn test_proof_kinds_are_not_interchangeable() {
    let mut machine = allow_list_machine();
    let borrower = Address::from_label("alice");

    let err = machine
        .request_loan(&borrower, &fixture_proof(INTEREST_INPUT))
        .unwrap_err();
    assert_eq!(err, Error::InvalidProof { kind: ProofKind::Collateral });

    machine
        .request_loan(&borrower, &fixture_proof(COLLATERAL_INPUT))
        .unwrap();
    let err = machine
        .calculate_interest_and_check_liquidation(&borrower, &fixture_proof(COLLATERAL_INPUT))
        .unwrap_err();
    assert_eq!(err, Error::InvalidProof { kind: ProofKind::InterestLiquidation });
}

#[test]
fn test_borrowers_are_isolated() {
    let mut machine = allow_list_machine();
    let alice = Address::from_label("alice");
    let bob = Address::from_label("bob");

    machine.request_loan(&alice, &fixture_proof(COLLATERAL_INPUT)).unwrap();
    machine
        .calculate_interest_and_check_liquidation(&alice, &fixture_proof(INTEREST_INPUT))
        .unwrap();

    assert_eq!(machine.get_loan_details(&bob).unwrap(), LoanRecord::default());

    // Bob has no loan, so interest is refused before verification
    let err = machine
        .calculate_interest_and_check_liquidation(&bob, &fixture_proof(INTEREST_INPUT))
        .unwrap_err();
    assert_eq!(err, Error::LoanNotApproved(bob));
    assert_eq!(machine.verifier_stats(ProofKind::InterestLiquidation).total_verifications, 1);

    machine.request_loan(&bob, &fixture_proof(COLLATERAL_INPUT)).unwrap();
    let bob_record = machine.get_loan_details(&bob).unwrap();
    assert_eq!(bob_record.accrued_interest, 0);
    assert!(!bob_record.is_liquidatable);
    assert_eq!(machine.get_loan_details(&alice).unwrap().accrued_interest, 75);
    assert_eq!(machine.loans().unwrap().len(), 2);
}

#[test]
fn test_interest_proof_is_idempotent() {
    let mut machine = allow_list_machine();
    let borrower = Address::from_label("alice");
    let proof = fixture_proof(INTEREST_INPUT);

    machine.request_loan(&borrower, &fixture_proof(COLLATERAL_INPUT)).unwrap();
    let first = machine
        .calculate_interest_and_check_liquidation(&borrower, &proof)
        .unwrap();
    let second = machine
        .calculate_interest_and_check_liquidation(&borrower, &proof)
        .unwrap();

    assert_eq!(first.record, second.record);
    assert!(first.liquidation_changed);
    assert!(!second.liquidation_changed);
    // Interest is replaced, not summed
    assert_eq!(second.record.accrued_interest, 75);
}

#[test]
fn test_reapproval_policies() {
    let borrower = Address::from_label("alice");
    let proof = fixture_proof(COLLATERAL_INPUT);

    // Default policy: a second request replaces principal and collateral only
    let mut machine = allow_list_machine();
    machine.request_loan(&borrower, &proof).unwrap();
    machine
        .calculate_interest_and_check_liquidation(&borrower, &fixture_proof(INTEREST_INPUT))
        .unwrap();

    let replaced = machine.request_loan(&borrower, &proof).unwrap();
    assert!(replaced.replaced_existing);
    assert_eq!(replaced.record.loan_amount, 5000);
    assert_eq!(replaced.record.collateral_amount, 8000);
    assert_eq!(replaced.record.accrued_interest, 75);
    assert!(replaced.record.is_liquidatable);

    let config = LendingConfig {
        reapproval_policy: ReapprovalPolicy::Reject,
        ..LendingConfig::default()
    };
    let mut strict = LendingStateMachine::new(
        InMemoryStore::new(),
        StaticVerifier::accept_all(),
        StaticVerifier::accept_all(),
        config,
    );
    strict.request_loan(&borrower, &proof).unwrap();
    let err = strict.request_loan(&borrower, &proof).unwrap_err();
    assert_eq!(err, Error::LoanAlreadyApproved(borrower));
    assert_eq!(strict.verifier_stats(ProofKind::Collateral).total_verifications, 1);
}

#[test]
fn test_forged_collateral_proof_on_liquidatable_loan() {
    let mut machine = allow_list_machine();
    let borrower = Address::from_label("alice");

    machine.request_loan(&borrower, &fixture_proof(COLLATERAL_INPUT)).unwrap();
    machine
        .calculate_interest_and_check_liquidation(&borrower, &fixture_proof(INTEREST_INPUT))
        .unwrap();
    let before = machine.get_loan_details(&borrower).unwrap();
    assert_eq!(before.status(), LoanStatus::Liquidatable);

    let events = recorded_events(&mut machine);
    let logged = machine.events().len();

    let err = machine
        .request_loan(&borrower, &zero_input(&fixture_proof(COLLATERAL_INPUT)))
        .unwrap_err();
    assert_eq!(err, Error::InvalidProof { kind: ProofKind::Collateral });

    let after = machine.get_loan_details(&borrower).unwrap();
    assert_eq!(after, before);
    assert_eq!(after.loan_amount, 5000);
    assert_eq!(after.collateral_amount, 8000);
    assert_eq!(after.accrued_interest, 75);
    assert!(after.is_loan_approved);
    assert!(after.is_liquidatable);
    assert_eq!(machine.events().len(), logged);
    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn test_get_loan_details_is_idempotent() {
    let mut machine = allow_list_machine();
    let borrower = Address::from_label("alice");

    let first = machine.get_loan_details(&borrower).unwrap();
    let second = machine.get_loan_details(&borrower).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, LoanRecord::default());
    assert!(machine.borrowers().unwrap().is_empty());

    machine.request_loan(&borrower, &fixture_proof(COLLATERAL_INPUT)).unwrap();
    machine
        .calculate_interest_and_check_liquidation(&borrower, &fixture_proof(INTEREST_INPUT))
        .unwrap();
    let logged = machine.events().len();

    let first = machine.get_loan_details(&borrower).unwrap();
    let second = machine.get_loan_details(&borrower).unwrap();
    assert_eq!(first, second);
    assert_eq!(machine.events().len(), logged);
}

#[test]
fn test_malformed_inputs_do_not_write() {
    let mut machine = LendingStateMachine::new(
        InMemoryStore::new(),
        StaticVerifier::accept_all(),
        StaticVerifier::accept_all(),
        LendingConfig::default(),
    );
    let borrower = Address::from_label("alice");

    let short = Groth16Proof::default().with_input(inputs(COLLATERAL_INPUT)[..6].to_vec());
    let err = machine.request_loan(&borrower, &short).unwrap_err();
    assert_eq!(
        err,
        Error::SchemaMismatch {
            kind: ProofKind::Collateral,
            expected: 7,
            got: 6,
        }
    );

    let mut oversized = inputs(COLLATERAL_INPUT);
    oversized[2] = FieldElement::from_be_bytes([0xff; 32]);
    let err = machine
        .request_loan(&borrower, &Groth16Proof::default().with_input(oversized))
        .unwrap_err();
    assert!(matches!(err, Error::ValueOutOfRange { position: 2, .. }));

    assert!(machine.borrowers().unwrap().is_empty());
    assert!(machine.events().is_empty());
}

#[test]
fn test_execute_dispatches_operations() {
    let mut machine = allow_list_machine();
    let borrower = Address::from_label("alice");

    let result = machine
        .execute(RequestLoanOp::new(borrower, fixture_proof(COLLATERAL_INPUT)).into())
        .unwrap();
    assert!(matches!(result, OperationResult::LoanApproved(_)));

    let result = machine
        .execute(CalculateInterestOp::new(borrower, fixture_proof(INTEREST_INPUT)).into())
        .unwrap();
    assert!(matches!(result, OperationResult::InterestCalculated(_)));
    assert_eq!(result.record().accrued_interest, 75);
}

// ═══════════════════════════════════════════════════════════════════════════════
// GROTH16 TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_lifecycle_with_groth16_proofs() {
    let mut rng = StdRng::seed_from_u64(0);
    let collateral = Prover::setup(&mut rng);
    let interest = Prover::setup(&mut rng);

    let collateral_proof = collateral.prove(&mut rng, COLLATERAL_INPUT);
    let interest_proof = interest.prove(&mut rng, INTEREST_INPUT);

    let mut machine = LendingStateMachine::new(
        InMemoryStore::new(),
        collateral.verifier.clone(),
        interest.verifier.clone(),
        LendingConfig::default(),
    );
    let borrower = Address::from_label("alice");

    // Scenario C against a real key
    let err = machine
        .request_loan(&borrower, &zero_input(&collateral_proof))
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid collateral zk-SNARK proof");
    assert_eq!(machine.get_loan_details(&borrower).unwrap(), LoanRecord::default());

    // Scenario A
    machine.request_loan(&borrower, &collateral_proof).unwrap();

    // A collateral proof does not satisfy the interest key
    let err = machine
        .calculate_interest_and_check_liquidation(&borrower, &collateral_proof)
        .unwrap_err();
    assert_eq!(err, Error::InvalidProof { kind: ProofKind::InterestLiquidation });

    // Scenario D
    let err = machine
        .calculate_interest_and_check_liquidation(&borrower, &zero_input(&interest_proof))
        .unwrap_err();
    assert_eq!(err.to_string(), "Invalid interest liquidation zk-SNARK proof");

    // Scenario B
    machine
        .calculate_interest_and_check_liquidation(&borrower, &interest_proof)
        .unwrap();

    let record = machine.get_loan_details(&borrower).unwrap();
    assert_eq!(record.loan_amount, 5000);
    assert_eq!(record.collateral_amount, 8000);
    assert_eq!(record.accrued_interest, 75);
    assert!(record.is_loan_approved);
    assert!(record.is_liquidatable);

    let stats = machine.verifier_stats(ProofKind::InterestLiquidation);
    assert_eq!(stats.total_verifications, 3);
    assert_eq!(stats.accepted, 1);
}

#[test]
fn test_groth16_proof_survives_json_transport() {
    let mut rng = StdRng::seed_from_u64(0);
    let prover = Prover::setup(&mut rng);
    let proof = prover.prove(&mut rng, COLLATERAL_INPUT);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("collateral.json");
    std::fs::write(&path, proof.to_json().unwrap()).unwrap();

    let loaded = Groth16Proof::from_file(&path).unwrap();
    assert_eq!(loaded, proof);

    let mut machine = LendingStateMachine::new(
        InMemoryStore::new(),
        prover.verifier.clone(),
        StaticVerifier::reject_all(),
        LendingConfig::default(),
    );
    let result = machine
        .request_loan(&Address::from_label("alice"), &loaded)
        .unwrap();
    assert_eq!(result.proof_hash, proof.hash());
}

// ═══════════════════════════════════════════════════════════════════════════════
// PERSISTENCE AND CONFIG TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_ledger_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let borrower = Address::from_label("alice");

    {
        let store = FileStore::new(dir.path()).unwrap();
        let mut machine = LendingStateMachine::new(
            store,
            StaticVerifier::accept_all(),
            StaticVerifier::accept_all(),
            LendingConfig::default(),
        );
        machine.request_loan(&borrower, &fixture_proof(COLLATERAL_INPUT)).unwrap();
        machine
            .calculate_interest_and_check_liquidation(&borrower, &fixture_proof(INTEREST_INPUT))
            .unwrap();
    }

    let store = FileStore::new(dir.path()).unwrap();
    let machine = LendingStateMachine::new(
        store,
        StaticVerifier::reject_all(),
        StaticVerifier::reject_all(),
        LendingConfig::default(),
    );
    let record = machine.get_loan_details(&borrower).unwrap();
    assert_eq!(record.loan_amount, 5000);
    assert_eq!(record.accrued_interest, 75);
    assert!(record.is_liquidatable);
    assert_eq!(machine.borrowers().unwrap(), vec![borrower]);
}

#[test]
fn test_storage_failure_leaves_loan_and_events_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let borrower = Address::from_label("alice");
    let mut machine = LendingStateMachine::new(
        FileStore::new(dir.path()).unwrap(),
        StaticVerifier::accept_all(),
        StaticVerifier::accept_all(),
        LendingConfig::default(),
    );
    machine.request_loan(&borrower, &fixture_proof(COLLATERAL_INPUT)).unwrap();
    machine
        .calculate_interest_and_check_liquidation(&borrower, &fixture_proof(INTEREST_INPUT))
        .unwrap();
    let before = machine.get_loan_details(&borrower).unwrap();
    let logged = machine.events().len();

    std::fs::create_dir(dir.path().join("data.tmp")).unwrap();

    let mut other = COLLATERAL_INPUT;
    other[2] = 1;
    let err = machine.request_loan(&borrower, &fixture_proof(other)).unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
    assert_eq!(machine.get_loan_details(&borrower).unwrap(), before);
    assert_eq!(machine.events().len(), logged);
}

#[test]
fn test_config_selects_storage_backend() {
    let dir = tempfile::tempdir().unwrap();
    let borrower = Address::from_label("alice");

    let vars = [
        ("PRIVATE_LENDING_DATA_DIR", dir.path().to_string_lossy().to_string()),
        ("PRIVATE_LENDING_STORAGE_FORMAT", "binary".to_string()),
        ("PRIVATE_LENDING_REAPPROVAL_POLICY", "reject".to_string()),
    ];
    let config = LendingConfig::default()
        .with_overrides(|name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.clone())
        })
        .unwrap();
    assert_eq!(config.storage_format, StorageFormat::Binary);
    assert_eq!(config.reapproval_policy, ReapprovalPolicy::Reject);

    config.save(config.config_path()).unwrap();
    let reloaded = LendingConfig::load(config.config_path()).unwrap();
    assert_eq!(reloaded, config);

    {
        let mut machine = LendingStateMachine::new(
            reloaded.open_storage().unwrap(),
            StaticVerifier::accept_all(),
            StaticVerifier::accept_all(),
            reloaded.clone(),
        );
        machine.request_loan(&borrower, &fixture_proof(COLLATERAL_INPUT)).unwrap();
        assert!(matches!(
            machine.request_loan(&borrower, &fixture_proof(COLLATERAL_INPUT)),
            Err(Error::LoanAlreadyApproved(_))
        ));
    }

    assert!(reloaded.ledger_dir().join("data.bin").exists());
    let machine = LendingStateMachine::new(
        reloaded.open_storage().unwrap(),
        StaticVerifier::reject_all(),
        StaticVerifier::reject_all(),
        reloaded.clone(),
    );
    assert!(machine.get_loan_details(&borrower).unwrap().is_loan_approved);
}
