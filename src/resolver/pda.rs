use solana_sdk::pubkey::Pubkey;

use crate::common::token_layout::{
    METADATA_PDA_SEED, TOKEN_METADATA_2022_PROGRAM_ID, TOKEN_METADATA_PROGRAM_ID,
};

/// Metadata program variants, in the order their PDAs are tried.
pub const METADATA_PROGRAMS: [Pubkey; 2] =
    [TOKEN_METADATA_PROGRAM_ID, TOKEN_METADATA_2022_PROGRAM_ID];

/// Derives `["metadata", program, mint]` under `program`.
pub fn find_metadata_address(mint: &Pubkey, program: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(
        &[METADATA_PDA_SEED, program.as_ref(), mint.as_ref()],
        program,
    )
}

pub fn metadata_candidates(mint: &Pubkey) -> [Pubkey; 2] {
    METADATA_PROGRAMS.map(|program| find_metadata_address(mint, &program).0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey;

    #[test]
    fn test_derivation_is_deterministic() {
        let mint = pubkey!("So11111111111111111111111111111111111111112");
        let (first, bump) = find_metadata_address(&mint, &TOKEN_METADATA_PROGRAM_ID);
        let expected = Pubkey::create_program_address(
            &[
                METADATA_PDA_SEED,
                TOKEN_METADATA_PROGRAM_ID.as_ref(),
                mint.as_ref(),
                &[bump],
            ],
            &TOKEN_METADATA_PROGRAM_ID,
        )
        .unwrap();
        assert_eq!(first, expected);
        assert!(!first.is_on_curve());
    }

    #[test]
    fn test_candidates_are_distinct() {
        let mint = Pubkey::new_unique();
        let [first, second] = metadata_candidates(&mint);
        assert_ne!(first, second);
        assert_eq!(first, find_metadata_address(&mint, &TOKEN_METADATA_PROGRAM_ID).0);
    }
}
