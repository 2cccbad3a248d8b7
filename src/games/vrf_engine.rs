use crate::games::symbols::{SymbolId, SymbolTable};
use crate::games::types::GRID_COLS;
use schnorrkel::{Keypair, PublicKey, Signature};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

const VRF_SIGNING_CONTEXT: &[u8] = b"substrate";

/// Bytes of VRF output consumed per reel
const REEL_CHUNK: usize = 4;

/// Verifiable randomness attached to every program spin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VRFBundle {
    pub vrf_output: String,
    pub vrf_proof: String,
    pub public_key: String,
    pub input_message: String,
}

/// VRF-based reel generator
pub struct VRFGameEngine {
    keypair: Arc<Keypair>,
}

impl VRFGameEngine {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair: Arc::new(keypair),
        }
    }

    /// Create a new VRF engine with a random keypair
    pub fn new_random() -> Self {
        use rand_core::OsRng;
        let keypair = Keypair::generate_with(OsRng);
        Self::new(keypair)
    }

    /// Input message for a spin: `signature:player:bet_lamports`
    pub fn spin_input(signature: &str, player: &str, bet_lamports: u64) -> String {
        format!("{}:{}:{}", signature, player, bet_lamports)
    }

    /// Generate output and proof for a spin
    pub fn generate_outcome(
        &self,
        signature: &str,
        player: &str,
        bet_lamports: u64,
    ) -> Result<VRFBundle, String> {
        let input_message = Self::spin_input(signature, player, bet_lamports);
        let (vrf_output, vrf_proof) = self.vrf_sign(input_message.as_bytes())?;
        let public_key = self.keypair.public.to_bytes();

        Ok(VRFBundle {
            vrf_output: hex::encode(vrf_output),
            vrf_proof: hex::encode(vrf_proof),
            public_key: hex::encode(public_key),
            input_message,
        })
    }

    fn vrf_sign(&self, message: &[u8]) -> Result<(Vec<u8>, Vec<u8>), String> {
        use schnorrkel::context::SigningContext;

        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        let transcript = ctx.bytes(message);
        let signature = self.keypair.sign(transcript);

        // Output is the hash of the signature
        let mut hasher = Sha256::new();
        hasher.update(signature.to_bytes());
        let vrf_output = hasher.finalize().to_vec();

        let vrf_proof = signature.to_bytes().to_vec();

        Ok((vrf_output, vrf_proof))
    }

    /// Map VRF output to three payline identities.
    ///
    /// Each reel reads a big-endian 4-byte chunk, reduces it modulo the table's
    /// total weight and walks the cumulative weights, so reels land on symbols
    /// with the same frequencies the animation shows.
    pub fn compute_payline(vrf_output: &[u8], table: &SymbolTable) -> [SymbolId; GRID_COLS] {
        let total_weight = table.total_weight().max(1);
        std::array::from_fn(|reel| {
            let start = reel * REEL_CHUNK;
            let mut chunk = [0u8; REEL_CHUNK];
            if let Some(bytes) = vrf_output.get(start..start + REEL_CHUNK) {
                chunk.copy_from_slice(bytes);
            }
            let mut roll = u32::from_be_bytes(chunk) as u64 % total_weight;
            for symbol in table.all() {
                let weight = symbol.display_weight as u64;
                if roll < weight {
                    return symbol.id;
                }
                roll -= weight;
            }
            table.default_symbol().id
        })
    }

    /// Verify a VRF bundle against the expected input
    pub fn verify_vrf_proof(vrf_bundle: &VRFBundle, expected_input: &str) -> Result<bool, String> {
        if vrf_bundle.input_message != expected_input {
            return Ok(false);
        }

        let vrf_output = hex::decode(&vrf_bundle.vrf_output)
            .map_err(|e| format!("Invalid VRF output hex: {}", e))?;
        let vrf_proof = hex::decode(&vrf_bundle.vrf_proof)
            .map_err(|e| format!("Invalid VRF proof hex: {}", e))?;
        let public_key_bytes = hex::decode(&vrf_bundle.public_key)
            .map_err(|e| format!("Invalid public key hex: {}", e))?;

        let public_key_array: [u8; 32] = public_key_bytes
            .try_into()
            .map_err(|_| "Public key must be 32 bytes")?;
        let public_key = PublicKey::from_bytes(&public_key_array)
            .map_err(|e| format!("Invalid public key: {:?}", e))?;

        let signature_array: [u8; 64] = vrf_proof
            .try_into()
            .map_err(|_| "Signature must be 64 bytes")?;
        let signature = Signature::from_bytes(&signature_array)
            .map_err(|e| format!("Invalid signature: {:?}", e))?;

        use schnorrkel::context::SigningContext;
        let ctx = SigningContext::new(VRF_SIGNING_CONTEXT);
        let transcript = ctx.bytes(expected_input.as_bytes());

        if public_key.verify(transcript, &signature).is_err() {
            return Ok(false);
        }

        let mut hasher = Sha256::new();
        hasher.update(signature_array);
        let computed_output = hasher.finalize();

        Ok(computed_output.as_slice() == vrf_output.as_slice())
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.keypair.public.to_bytes())
    }
}
