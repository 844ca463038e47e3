//! L1 rollup contract events used as settlement evidence.
//!
//! Only the event signatures matter to the tracker: a batch receipt carrying one of the
//! submission events is a committed batch awaiting its proof, a receipt carrying one of the
//! verification events is a batch whose validity proof was accepted on L1.

use alloy_sol_types::sol;

sol! {
    // *********************ZKSYNC*********************
    #[derive(Debug)]
    event BlockCommit(uint256 indexed batchNumber, bytes32 indexed batchHash, bytes32 indexed commitment);

    #[derive(Debug)]
    event BlocksVerification(uint256 indexed previousLastVerifiedBatch, uint256 indexed currentLastVerifiedBatch);

    // *********************POLYGON ZKEVM*********************
    #[derive(Debug)]
    event SequenceBatches(uint64 indexed numBatch);

    #[derive(Debug)]
    event VerifyBatchesTrustedAggregator(uint64 indexed numBatch, bytes32 stateRoot, address indexed aggregator);

    // *********************SCROLL*********************
    #[derive(Debug)]
    event CommitBatch(uint256 indexed batchIndex, bytes32 indexed batchHash);

    #[derive(Debug)]
    event FinalizeBatch(uint256 indexed batchIndex, bytes32 indexed batchHash, bytes32 stateRoot, bytes32 withdrawRoot);

    // *********************LINEA*********************
    #[derive(Debug)]
    event DataSubmittedV3(bytes32 parentShnarf, bytes32 indexed shnarf, bytes32 finalStateRootHash);

    #[derive(Debug)]
    event DataFinalizedV3(uint256 indexed startBlockNumber, uint256 indexed endBlockNumber, bytes32 indexed shnarf, bytes32 parentStateRootHash, bytes32 finalStateRootHash);
}
