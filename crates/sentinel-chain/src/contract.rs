//! ABI bindings for the treasury vault and its settlement asset.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface ITreasuryVault {
        function policyCount() external view returns (uint256);

        function getPolicy(uint256 policyId)
            external
            view
            returns (
                bool enabled,
                bool requiresApproval,
                bool approved,
                uint256 intervalSeconds,
                uint256 nextExecutionTime,
                uint256 maxPerExecution,
                uint256 executions,
                uint256 lastExecutedAt,
                address[] memory recipients,
                uint256[] memory amounts
            );

        function totalPerExecution(uint256 policyId) external view returns (uint256);

        function paused() external view returns (bool);

        function usdc() external view returns (address);

        function agent() external view returns (address);

        function executePolicy(uint256 policyId) external;
    }

    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}
