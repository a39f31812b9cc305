use alloy_primitives::{Bytes, B256, U256};

use attestor_types::{BatchMetadata, ProofOfExecution, QuorumConfig, StateHeader};

use crate::{
    build_state_header, encode_metadata, header_digest, pack_proof, validate_quorum,
    verify_signature, BlsSigner, QuorumError, PACKED_PROOF_LEN,
};

fn poe() -> ProofOfExecution {
    ProofOfExecution {
        batch_id: 4412,
        start_block: 100,
        end_block: 120,
        prev_state_root: B256::repeat_byte(0x11),
        new_state_root: B256::repeat_byte(0x22),
        batch_hash: B256::repeat_byte(0x33),
    }
}

fn header() -> StateHeader {
    build_state_header(&poe(), 160, U256::from(534352u64), &QuorumConfig::default())
}

// =============================================================================
// Header construction
// =============================================================================

#[test]
fn test_packed_proof_order() {
    let packed = pack_proof(&poe());
    assert_eq!(packed.len(), PACKED_PROOF_LEN);
    assert_eq!(&packed[..32], B256::repeat_byte(0x11).as_slice());
    assert_eq!(&packed[32..64], B256::repeat_byte(0x22).as_slice());
    assert_eq!(&packed[64..], B256::repeat_byte(0x33).as_slice());
}

#[test]
fn test_metadata_encoding_is_canonical() {
    let md = poe().metadata();
    let encoded = encode_metadata(&md);

    assert_eq!(&encoded[..], br#"{"batchId":4412,"startBlock":100,"endBlock":120}"#);
    // same bytes serde would produce, and they read back
    assert_eq!(encoded.to_vec(), serde_json::to_vec(&md).unwrap());
    assert_eq!(serde_json::from_slice::<BatchMetadata>(&encoded).unwrap(), md);
}

#[test]
fn test_header_fields() {
    let header = header();
    assert_eq!(header.identifier, U256::from(534352u64));
    assert_eq!(header.state, pack_proof(&poe()));
    assert_eq!(header.quorum_numbers, Bytes::from_static(&[0]));
    assert_eq!(header.quorum_threshold_percentages, Bytes::from_static(&[0]));
    assert_eq!(header.reference_block_number, 159);
}

#[test]
fn test_reference_block_saturates() {
    let quorum = QuorumConfig::default();
    assert_eq!(build_state_header(&poe(), 0, U256::ZERO, &quorum).reference_block_number, 0);
    assert_eq!(build_state_header(&poe(), 1, U256::ZERO, &quorum).reference_block_number, 0);
}

// =============================================================================
// Digest
// =============================================================================

#[test]
fn test_digest_is_deterministic() {
    assert_eq!(header_digest(&header()), header_digest(&header()));
    assert_ne!(header_digest(&header()), B256::ZERO);
}

#[test]
fn test_digest_covers_every_field() {
    let base = header_digest(&header());

    let mutations: [(&str, fn(&mut StateHeader)); 6] = [
        ("identifier", |h: &mut StateHeader| h.identifier += U256::from(1u64)),
        ("metadata", |h: &mut StateHeader| {
            h.metadata = encode_metadata(&BatchMetadata {
                batch_id: 4413,
                start_block: 100,
                end_block: 120,
            })
        }),
        ("state", |h: &mut StateHeader| {
            let mut state = h.state.to_vec();
            state[95] ^= 1;
            h.state = state.into();
        }),
        ("quorumNumbers", |h: &mut StateHeader| h.quorum_numbers = Bytes::from_static(&[1])),
        ("quorumThresholdPercentages", |h: &mut StateHeader| {
            h.quorum_threshold_percentages = Bytes::from_static(&[67])
        }),
        ("referenceBlockNumber", |h: &mut StateHeader| h.reference_block_number += 1),
    ];

    for (field, mutate) in mutations {
        let mut mutated = header();
        mutate(&mut mutated);
        assert_ne!(header_digest(&mutated), base, "mutating {field} kept the digest");
    }
}

#[test]
fn test_signed_header_verifies_against_digest() {
    let signer = BlsSigner::from_seed(&[9u8; 32]).unwrap();
    let operator_id = B256::repeat_byte(0x01);

    let submission = signer.sign_header(header(), operator_id, false);
    assert_eq!(submission.digest, header_digest(&submission.header));
    assert_eq!(submission.operator_id, operator_id);
    assert!(submission.pubkey.is_none());
    verify_signature(&signer.public_key_bytes(), submission.digest, &submission.signature).unwrap();

    let legacy = signer.sign_header(header(), operator_id, true);
    assert_eq!(legacy.pubkey.as_ref().map(|p| &p[..]), Some(&signer.public_key_bytes()[..]));
    assert_eq!(legacy.signature, submission.signature);
}

// =============================================================================
// Quorum validation
// =============================================================================

#[test]
fn test_validate_quorum() {
    let quorum = |numbers: &[u8], thresholds: &[u8]| QuorumConfig {
        quorum_numbers: numbers.to_vec(),
        threshold_percentages: thresholds.to_vec(),
    };

    assert_eq!(validate_quorum(&QuorumConfig::default()), Ok(()));
    assert_eq!(validate_quorum(&quorum(&[0, 1], &[67, 100])), Ok(()));
    assert_eq!(
        validate_quorum(&quorum(&[0, 1], &[67])),
        Err(QuorumError::LengthMismatch { numbers: 2, thresholds: 1 })
    );
    assert_eq!(
        validate_quorum(&quorum(&[0, 3], &[50, 101])),
        Err(QuorumError::ThresholdAbove100 { quorum: 3, threshold: 101 })
    );
    assert_eq!(validate_quorum(&quorum(&[], &[])), Err(QuorumError::Empty));
}
