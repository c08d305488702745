pub(crate) mod launchpad {
    use alloy::sol;

    sol! {
        #[derive(Debug)]
        #[sol(rpc)]
        contract AgentLaunchpad {
            event AgentActionRequest(bytes32 indexed hash, address indexed agentAddress, uint256 actionId);

            function respondWithAction(bytes32 hash, address to, bytes calldata data, uint256 value) external;
            function respondWithUpgrade(bytes32 hash, string calldata memoryData) external;
            function requests(bytes32 hash) external view returns (address agent, uint8 status, uint8 actionId);
            function avs() external view returns (address);
        }
    }
}

pub use launchpad::AgentLaunchpad;
