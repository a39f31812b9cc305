//! BLS12-381 signing in the min-pk variant: public keys in G1, signatures in G2.

use alloy_primitives::{keccak256, Bytes, B256};
use blst::{
    min_pk::{AggregateSignature, PublicKey, SecretKey, Signature},
    BLST_ERROR,
};

use attestor_types::{OperatorId, SignedSubmission, StateHeader};

use super::{header_digest, SigningError};

/// Domain separation tag for every header signature.
pub const BLS_DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

/// Uncompressed G1 public key length.
pub const PUBLIC_KEY_LEN: usize = 96;

/// Compressed G2 signature length.
pub const SIGNATURE_LEN: usize = 96;

fn describe(err: BLST_ERROR) -> String {
    format!("{err:?}")
}

fn check(err: BLST_ERROR) -> Result<(), SigningError> {
    match err {
        BLST_ERROR::BLST_SUCCESS => Ok(()),
        other => Err(SigningError::Verification(describe(other))),
    }
}

/// The operator's BLS key pair.
pub struct BlsSigner {
    secret: SecretKey,
    public: PublicKey,
}

impl std::fmt::Debug for BlsSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlsSigner").field("commitment", &self.pubkey_commitment()).finish()
    }
}

impl BlsSigner {
    /// Load a 32-byte big-endian secret scalar.
    pub fn from_bytes(secret: &[u8]) -> Result<Self, SigningError> {
        let secret =
            SecretKey::from_bytes(secret).map_err(|e| SigningError::InvalidSecretKey(describe(e)))?;
        Ok(Self::from_secret(secret))
    }

    /// Derive a key from at least 32 bytes of input keying material.
    pub fn from_seed(ikm: &[u8]) -> Result<Self, SigningError> {
        let secret =
            SecretKey::key_gen(ikm, &[]).map_err(|e| SigningError::InvalidSecretKey(describe(e)))?;
        Ok(Self::from_secret(secret))
    }

    fn from_secret(secret: SecretKey) -> Self {
        let public = secret.sk_to_pk();
        Self { secret, public }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Uncompressed public key as registered and committed to on-chain.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.public.serialize()
    }

    /// keccak256 of [`Self::public_key_bytes`], the key the attestation registry indexes by.
    pub fn pubkey_commitment(&self) -> B256 {
        keccak256(self.public_key_bytes())
    }

    /// Sign a 32-byte digest; returns the compressed signature.
    pub fn sign_digest(&self, digest: B256) -> Bytes {
        let sig = self.secret.sign(digest.as_slice(), BLS_DST, &[]);
        Bytes::copy_from_slice(&sig.compress())
    }

    /// Digest and sign `header` for submission as `operator_id`.
    pub fn sign_header(
        &self,
        header: StateHeader,
        operator_id: OperatorId,
        include_pubkey: bool,
    ) -> SignedSubmission {
        let digest = header_digest(&header);
        SignedSubmission {
            signature: self.sign_digest(digest),
            pubkey: include_pubkey.then(|| Bytes::copy_from_slice(&self.public_key_bytes())),
            header,
            digest,
            operator_id,
        }
    }
}

fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, SigningError> {
    let pk = PublicKey::deserialize(bytes).map_err(|e| SigningError::InvalidPublicKey(describe(e)))?;
    pk.validate().map_err(|e| SigningError::InvalidPublicKey(describe(e)))?;
    Ok(pk)
}

fn parse_signature(bytes: &[u8]) -> Result<Signature, SigningError> {
    Signature::from_bytes(bytes).map_err(|e| SigningError::InvalidSignature(describe(e)))
}

/// Verify one operator's signature over `digest`.
pub fn verify_signature(pubkey: &[u8], digest: B256, signature: &[u8]) -> Result<(), SigningError> {
    let pk = parse_public_key(pubkey)?;
    let sig = parse_signature(signature)?;
    check(sig.verify(true, digest.as_slice(), BLS_DST, &[], &pk, false))
}

/// Combine signatures over the same digest into one compressed signature.
pub fn aggregate_signatures<S: AsRef<[u8]>>(signatures: &[S]) -> Result<Bytes, SigningError> {
    if signatures.is_empty() {
        return Err(SigningError::EmptyAggregate);
    }

    let sigs =
        signatures.iter().map(|s| parse_signature(s.as_ref())).collect::<Result<Vec<_>, _>>()?;
    let refs: Vec<&Signature> = sigs.iter().collect();
    let agg = AggregateSignature::aggregate(&refs, true)
        .map_err(|e| SigningError::InvalidSignature(describe(e)))?;

    Ok(Bytes::copy_from_slice(&agg.to_signature().compress()))
}

/// Verify an aggregate signature from `pubkeys` over a single `digest`.
pub fn verify_aggregate<P: AsRef<[u8]>>(
    pubkeys: &[P],
    digest: B256,
    aggregate: &[u8],
) -> Result<(), SigningError> {
    if pubkeys.is_empty() {
        return Err(SigningError::EmptyAggregate);
    }

    let pks = pubkeys.iter().map(|p| parse_public_key(p.as_ref())).collect::<Result<Vec<_>, _>>()?;
    let refs: Vec<&PublicKey> = pks.iter().collect();
    let sig = parse_signature(aggregate)?;

    check(sig.fast_aggregate_verify(true, digest.as_slice(), BLS_DST, &refs))
}
